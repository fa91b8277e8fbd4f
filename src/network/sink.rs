//! TCP sink non-blocking: kuras consumer langsung ke socket.
//!
//! Tidak ada write buffer tambahan seperti koneksi biasa: read grant dari ring
//! langsung jadi argumen `write`, dan hanya bytes yang diterima kernel yang
//! di-release. Sisanya tetap di ring sampai socket writable lagi.

use std::io::{self, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use mio::net::TcpStream as MioTcpStream;
use mio::{Events, Interest, Poll, Token};

use crate::core::Consumer;
use crate::stream::{PumpControl, PumpStats};

const SINK_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 16;
/// Batas tunggu writable per iterasi supaya stop flag tetap dicek
const WRITABLE_TIMEOUT: Duration = Duration::from_millis(100);

/// Hasil satu kali [`TcpSink::pump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkProgress {
    /// Bytes yang diterima socket
    pub sent: usize,
    /// `true` jika berhenti karena socket penuh (WouldBlock), bukan karena ring kosong
    pub blocked: bool,
}

/// Socket tujuan yang terdaftar di mio `Poll` untuk event WRITABLE.
pub struct TcpSink {
    poll: Poll,
    events: Events,
    stream: MioTcpStream,
    peer: SocketAddr,
    bytes_sent: u64,
}

impl TcpSink {
    /// Connect (blocking) lalu pindah ke mode non-blocking.
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::from_std(stream)
    }

    /// Wrap stream yang sudah terkoneksi (misalnya hasil `accept`).
    pub fn from_std(stream: TcpStream) -> io::Result<Self> {
        // Disable Nagle's algorithm untuk lower latency
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        let peer = stream.peer_addr()?;

        let mut stream = MioTcpStream::from_std(stream);
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut stream, SINK_TOKEN, Interest::WRITABLE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            stream,
            peer,
            bytes_sent: 0,
        })
    }

    /// Perbesar SO_SNDBUF. Error diteruskan, pemanggil boleh mengabaikannya.
    #[cfg(unix)]
    pub fn set_send_buffer_size(&self, bytes: usize) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let fd = self.stream.as_raw_fd();
        let optval = bytes.min(libc::c_int::MAX as usize) as libc::c_int;
        let rc = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_SNDBUF,
                &optval as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Tulis sebanyak mungkin data readable ke socket.
    ///
    /// Berhenti saat ring kosong atau socket mengembalikan WouldBlock.
    pub fn pump(&mut self, consumer: &mut Consumer, chunk: usize) -> io::Result<SinkProgress> {
        let mut sent = 0;

        loop {
            let grant = consumer.reserve(chunk);
            if grant.is_empty() {
                grant.release_prefix(0);
                return Ok(SinkProgress {
                    sent,
                    blocked: false,
                });
            }

            match self.stream.write(&grant) {
                Ok(0) => {
                    grant.release_prefix(0);
                    return Err(io::Error::new(
                        ErrorKind::WriteZero,
                        "Failed to write to socket",
                    ));
                }
                Ok(n) => {
                    grant.release_prefix(n);
                    sent += n;
                    self.bytes_sent += n as u64;
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    // Release 0: bytes tetap di ring untuk percobaan berikutnya
                    grant.release_prefix(0);
                    return Ok(SinkProgress {
                        sent,
                        blocked: true,
                    });
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => grant.release_prefix(0),
                Err(e) => {
                    grant.release_prefix(0);
                    return Err(e);
                }
            }
        }
    }

    /// Tunggu event WRITABLE. Returns `false` kalau timeout.
    ///
    /// Event mio bersifat edge-triggered: panggil ini hanya setelah
    /// [`TcpSink::pump`] melaporkan `blocked`.
    pub fn wait_writable(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == ErrorKind::Interrupted => return Ok(false),
            Err(e) => return Err(e),
        }
        Ok(self
            .events
            .iter()
            .any(|event| event.token() == SINK_TOKEN && event.is_writable()))
    }

    /// Jalankan sink sampai ring kosong DAN (stop atau producer di-drop).
    pub fn run(&mut self, consumer: &mut Consumer, control: &PumpControl) -> io::Result<PumpStats> {
        let mut stats = PumpStats::default();
        tracing::info!(peer = %self.peer, "streaming ring to subscriber");

        loop {
            let finished = consumer.producer_gone() || control.is_stopped();
            let progress = self.pump(consumer, control.chunk)?;

            if progress.sent > 0 {
                stats.bytes += progress.sent as u64;
                stats.grants += 1;
            }

            if progress.blocked {
                stats.stalls += 1;
                self.wait_writable(Some(WRITABLE_TIMEOUT))?;
            } else if progress.sent == 0 {
                if finished {
                    break;
                }
                stats.stalls += 1;
                control.wait.wait();
            }
        }

        self.stream.flush()?;
        tracing::info!(peer = %self.peer, bytes = stats.bytes, "subscriber stream finished");
        Ok(stats)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Total bytes yang sudah diterima socket
    #[inline(always)]
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::core::RingBuffer;
    use crate::stream::WaitStrategy;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 199) as u8).collect()
    }

    #[test]
    fn test_sink_streams_ring_to_peer() {
        const TOTAL: usize = 1 << 20;
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).unwrap();
            received
        });

        let (mut producer, mut consumer) = RingBuffer::create(8192).unwrap();
        let writer = thread::spawn(move || {
            let data = pattern(TOTAL);
            let mut sent = 0;
            while sent < TOTAL {
                let n = producer.write(&data[sent..]);
                if n == 0 {
                    thread::yield_now();
                }
                sent += n;
            }
        });

        let mut sink = TcpSink::connect(addr).unwrap();
        let control = PumpControl::new(WaitStrategy::Yield, 4096);
        let stats = sink.run(&mut consumer, &control).unwrap();
        writer.join().unwrap();

        assert_eq!(stats.bytes, TOTAL as u64);
        assert_eq!(sink.bytes_sent(), TOTAL as u64);
        drop(sink);

        assert_eq!(reader.join().unwrap(), pattern(TOTAL));
    }

    #[test]
    fn test_pump_on_empty_ring_sends_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (_producer, mut consumer) = RingBuffer::create(64).unwrap();

        let mut sink = TcpSink::connect(addr).unwrap();
        let _accepted = listener.accept().unwrap();

        let progress = sink.pump(&mut consumer, 64).unwrap();
        assert_eq!(
            progress,
            SinkProgress {
                sent: 0,
                blocked: false
            }
        );
        assert_eq!(sink.peer_addr(), addr);
    }
}
