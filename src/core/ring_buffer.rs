//! Wait-Free Single-Producer Single-Consumer (SPSC) Byte Ring Buffer
//!
//! Empat cursor logis yang hanya bergerak maju:
//!
//! ```text
//! read_tail <= read_head <= write_tail <= write_head <= read_tail + capacity
//! ```
//!
//! - `write_head`: ujung reservasi producer (belum terlihat oleh consumer)
//! - `write_tail`: batas data yang sudah di-commit producer
//! - `read_head`: ujung reservasi consumer
//! - `read_tail`: batas data yang sudah di-release consumer (ruang kembali ke producer)
//!
//! Producer hanya memajukan `write_*`, consumer hanya memajukan `read_*`.
//! Release di setiap commit, Acquire setiap kali membaca cursor milik pihak lain.
//! Tidak ada Mutex, tidak ada CAS, tidak ada spin di dalam buffer.
//!
//! Region yang dikembalikan `reserve` selalu kontigu. Permintaan yang melewati
//! ujung fisik storage dipotong di batas itu; sisanya butuh pasangan
//! reserve/commit kedua. Ini perilaku yang disengaja, bukan bug.

use std::fmt;
use std::ops::{Deref, DerefMut};

use super::storage::{Storage, StorageOptions};
use super::sync::{Arc, AtomicBool, AtomicUsize, Ordering};
use crate::error::{Result, RingError};

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    fn new(value: T) -> Self {
        Self { value }
    }
}

/// Pasangan cursor head/tail milik satu sisi.
struct Side {
    head: AtomicUsize,
    tail: AtomicUsize,
    alive: AtomicBool,
}

impl Side {
    fn new() -> Self {
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            alive: AtomicBool::new(true),
        }
    }
}

/// Smallest power of two `>= requested`.
///
/// `0` dan `1` sama-sama menjadi `1`; nilai yang sudah power of 2 tidak berubah.
/// Returns `None` kalau hasilnya tidak muat di `usize`.
pub const fn round_capacity(requested: usize) -> Option<usize> {
    if requested <= 1 {
        return Some(1);
    }
    requested.checked_next_power_of_two()
}

/// Snapshot keempat cursor.
///
/// Dibaca berurutan `read_tail`, `read_head`, `write_tail`, `write_head`
/// sehingga urutan invariant tetap terlihat walaupun pihak lain sedang jalan.
/// Angka absolutnya hanya eksak saat kedua sisi idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    pub write_head: usize,
    pub write_tail: usize,
    pub read_head: usize,
    pub read_tail: usize,
}

impl Cursors {
    /// Bytes yang sudah di-commit tapi belum direservasi consumer.
    pub fn readable(&self) -> usize {
        self.write_tail.wrapping_sub(self.read_head)
    }

    /// Bytes yang sedang dipakai (reservasi + data + reservasi baca).
    pub fn in_use(&self) -> usize {
        self.write_head.wrapping_sub(self.read_tail)
    }
}

/// Shared state ring buffer. Tidak pernah dipakai langsung: akses hanya
/// lewat [`Producer`] dan [`Consumer`] yang dibuat oleh [`RingBuffer::create`].
pub struct RingBuffer {
    // Producer side - cache line aligned
    write: CacheLinePadded<Side>,
    // Consumer side - cache line aligned
    read: CacheLinePadded<Side>,
    storage: Storage,
    capacity: usize,
    // Mask untuk operasi modulo yang cepat (capacity selalu power of 2)
    mask: usize,
}

impl RingBuffer {
    /// Alokasi ring buffer dan pecah jadi handle producer dan consumer.
    ///
    /// `requested_capacity` dibulatkan ke power of 2 terdekat ke atas.
    /// Alokasi hanya terjadi sekali di sini, tidak ada alokasi di hot path.
    pub fn create(requested_capacity: usize) -> Result<(Producer, Consumer)> {
        Self::with_options(requested_capacity, StorageOptions::default())
    }

    /// Sama seperti [`RingBuffer::create`] dengan opsi storage eksplisit.
    pub fn with_options(
        requested_capacity: usize,
        options: StorageOptions,
    ) -> Result<(Producer, Consumer)> {
        let capacity = round_capacity(requested_capacity).ok_or(RingError::CapacityOverflow {
            requested: requested_capacity,
        })?;

        let storage =
            Storage::map(capacity, options).map_err(|source| RingError::Alloc { capacity, source })?;

        tracing::debug!(
            requested = requested_capacity,
            capacity,
            locked = options.lock_memory,
            "ring buffer allocated"
        );

        let ring = Arc::new(RingBuffer {
            write: CacheLinePadded::new(Side::new()),
            read: CacheLinePadded::new(Side::new()),
            storage,
            capacity,
            mask: capacity - 1,
        });

        Ok((
            Producer {
                ring: Arc::clone(&ring),
            },
            Consumer { ring },
        ))
    }

    fn cursors(&self) -> Cursors {
        let read_tail = self.read.value.tail.load(Ordering::Acquire);
        let read_head = self.read.value.head.load(Ordering::Acquire);
        let write_tail = self.write.value.tail.load(Ordering::Acquire);
        let write_head = self.write.value.head.load(Ordering::Acquire);
        Cursors {
            write_head,
            write_tail,
            read_head,
            read_tail,
        }
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("cursors", &self.cursors())
            .finish()
    }
}

/// Handle producer. Hanya ada satu per ring dan tidak bisa di-clone.
///
/// Semua operasi yang memajukan cursor butuh `&mut self`, jadi producer kedua
/// yang jalan bersamaan ditolak oleh compiler.
pub struct Producer {
    ring: Arc<RingBuffer>,
}

impl Producer {
    /// Reservasi region writable kontigu sampai `max_len` bytes (Producer side)
    ///
    /// Panjang grant = `min(max_len, free, jarak ke ujung fisik storage)`,
    /// bisa 0 kalau buffer penuh atau `max_len == 0`. `write_head` langsung
    /// maju; data baru terlihat oleh consumer setelah [`WriteGrant::commit`].
    #[inline]
    pub fn reserve(&mut self, max_len: usize) -> WriteGrant<'_> {
        let ring: &RingBuffer = &self.ring;
        // Mulai dari tail milik sendiri: grant yang di-`mem::forget` hanya
        // meninggalkan head basi yang langsung ditimpa di sini
        let head = ring.write.value.tail.load(Ordering::Relaxed);
        // Acquire: release consumer sebelumnya harus terlihat sebelum angka free dipercaya
        let read_tail = ring.read.value.tail.load(Ordering::Acquire);

        let free = ring.capacity - head.wrapping_sub(read_tail);
        let offset = head & ring.mask;
        let len = max_len.min(free).min(ring.capacity - offset);

        ring.write
            .value
            .head
            .store(head.wrapping_add(len), Ordering::Relaxed);

        // SAFETY: [head, head + len) ada di dalam ruang free, tidak dipinjam consumer,
        // dan grant sebelumnya sudah selesai karena `&mut self`
        let buf = unsafe { ring.storage.slice_mut(offset, len) };
        ring.storage.track_write(offset, len);

        WriteGrant {
            ring,
            buf,
            token: head,
            remaining: free - len,
            finished: false,
        }
    }

    /// Tulis sebanyak mungkin dari `src` dalam satu siklus reserve/commit.
    ///
    /// Returns jumlah bytes yang benar-benar ditulis. Tidak loop melewati
    /// batas wrap: kalau hasilnya kurang dari `src.len()`, panggil lagi.
    #[inline]
    pub fn write(&mut self, src: &[u8]) -> usize {
        let mut grant = self.reserve(src.len());
        let n = grant.len();
        grant.copy_from_slice(&src[..n]);
        grant.commit();
        n
    }

    /// Ruang free saat ini.
    #[inline]
    pub fn free_len(&self) -> usize {
        let tail = self.ring.write.value.tail.load(Ordering::Relaxed);
        let read_tail = self.ring.read.value.tail.load(Ordering::Acquire);
        self.ring.capacity - tail.wrapping_sub(read_tail)
    }

    /// Apakah buffer penuh dilihat dari producer
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_len() == 0
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity
    }

    /// `true` setelah handle [`Consumer`] di-drop.
    #[inline]
    pub fn consumer_gone(&self) -> bool {
        !self.ring.read.value.alive.load(Ordering::Acquire)
    }

    pub fn cursors(&self) -> Cursors {
        self.ring.cursors()
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.ring.write.value.alive.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("ring", &*self.ring)
            .finish()
    }
}

/// Handle consumer. Hanya ada satu per ring dan tidak bisa di-clone.
pub struct Consumer {
    ring: Arc<RingBuffer>,
}

impl Consumer {
    /// Reservasi region readable kontigu sampai `max_len` bytes (Consumer side)
    ///
    /// Panjang grant = `min(max_len, readable, jarak ke ujung fisik storage)`,
    /// 0 berarti buffer kosong. Ruang baru kembali ke producer setelah
    /// [`ReadGrant::release`].
    #[inline]
    pub fn reserve(&mut self, max_len: usize) -> ReadGrant<'_> {
        let ring: &RingBuffer = &self.ring;
        let head = ring.read.value.tail.load(Ordering::Relaxed);
        // Acquire: bytes yang di-commit producer harus terlihat sebelum dibaca
        let write_tail = ring.write.value.tail.load(Ordering::Acquire);

        let used = write_tail.wrapping_sub(head);
        let offset = head & ring.mask;
        let len = max_len.min(used).min(ring.capacity - offset);

        ring.read
            .value
            .head
            .store(head.wrapping_add(len), Ordering::Relaxed);

        // SAFETY: [head, head + len) sudah di-commit producer dan producer
        // tidak akan menyentuhnya sampai read_tail melewatinya
        let buf = unsafe { ring.storage.slice(offset, len) };
        ring.storage.track_read(offset, len);

        ReadGrant {
            ring,
            buf,
            token: head,
            remaining: used - len,
            finished: false,
        }
    }

    /// Salin sebanyak mungkin ke `dst` dalam satu siklus reserve/release.
    ///
    /// Returns jumlah bytes yang dibaca (tidak loop melewati batas wrap).
    #[inline]
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let grant = self.reserve(dst.len());
        let n = grant.len();
        dst[..n].copy_from_slice(&grant);
        grant.release();
        n
    }

    /// Bytes yang siap dibaca saat ini.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.ring.read.value.tail.load(Ordering::Relaxed);
        let write_tail = self.ring.write.value.tail.load(Ordering::Acquire);
        write_tail.wrapping_sub(tail)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity
    }

    /// `true` setelah handle [`Producer`] di-drop.
    ///
    /// Acquire di sini berpasangan dengan Release di drop producer, jadi semua
    /// commit terakhir producer sudah terlihat begitu ini `true`.
    #[inline]
    pub fn producer_gone(&self) -> bool {
        !self.ring.write.value.alive.load(Ordering::Acquire)
    }

    pub fn cursors(&self) -> Cursors {
        self.ring.cursors()
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.ring.read.value.alive.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("ring", &*self.ring)
            .finish()
    }
}

/// Region writable hasil [`Producer::reserve`].
///
/// Deref ke `[u8]`. Harus di-commit untuk mempublikasikan isinya; grant yang
/// di-drop tanpa commit dibatalkan dan `write_head` mundur ke token.
#[must_use = "a write grant publishes nothing until it is committed"]
pub struct WriteGrant<'a> {
    ring: &'a RingBuffer,
    buf: &'a mut [u8],
    token: usize,
    remaining: usize,
    finished: bool,
}

impl WriteGrant<'_> {
    /// Panjang region.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// `write_head` sebelum reservasi ini.
    #[inline(always)]
    pub fn token(&self) -> usize {
        self.token
    }

    /// Ruang free yang tersisa setelah reservasi ini.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Publikasikan seluruh region ke consumer (Release).
    #[inline]
    pub fn commit(self) {
        let len = self.buf.len();
        self.commit_prefix(len);
    }

    /// Publikasikan hanya `used` bytes pertama; sisanya kembali ke producer.
    ///
    /// # Panics
    /// Panic jika `used` melebihi panjang grant.
    #[inline]
    pub fn commit_prefix(mut self, used: usize) {
        assert!(
            used <= self.buf.len(),
            "commit of {} bytes exceeds write grant of {} bytes",
            used,
            self.buf.len()
        );

        let side = &self.ring.write.value;
        debug_assert_eq!(side.tail.load(Ordering::Relaxed), self.token);

        let end = self.token.wrapping_add(used);
        if used < self.buf.len() {
            side.head.store(end, Ordering::Relaxed);
        }
        // Release: bytes di region harus terlihat sebelum write_tail baru
        side.tail.store(end, Ordering::Release);
        self.finished = true;
    }
}

impl Deref for WriteGrant<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf
    }
}

impl DerefMut for WriteGrant<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf
    }
}

impl Drop for WriteGrant<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.ring
            .write
            .value
            .head
            .store(self.token, Ordering::Relaxed);
        if !self.buf.is_empty() {
            tracing::debug!(
                token = self.token,
                len = self.buf.len(),
                "write grant dropped without commit, reservation abandoned"
            );
        }
    }
}

impl fmt::Debug for WriteGrant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGrant")
            .field("token", &self.token)
            .field("len", &self.buf.len())
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// Region readable hasil [`Consumer::reserve`].
///
/// Deref ke `[u8]`. Grant yang di-drop tanpa release dibatalkan: `read_head`
/// mundur dan bytes tetap bisa dibaca lagi.
#[must_use = "a read grant returns no space to the producer until it is released"]
pub struct ReadGrant<'a> {
    ring: &'a RingBuffer,
    buf: &'a [u8],
    token: usize,
    remaining: usize,
    finished: bool,
}

impl ReadGrant<'_> {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// `read_head` sebelum reservasi ini.
    #[inline(always)]
    pub fn token(&self) -> usize {
        self.token
    }

    /// Bytes readable yang tersisa setelah reservasi ini.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Kembalikan seluruh region ke producer (Release).
    #[inline]
    pub fn release(self) {
        let len = self.buf.len();
        self.release_prefix(len);
    }

    /// Kembalikan hanya `used` bytes pertama; sisanya tetap readable.
    ///
    /// # Panics
    /// Panic jika `used` melebihi panjang grant.
    #[inline]
    pub fn release_prefix(mut self, used: usize) {
        assert!(
            used <= self.buf.len(),
            "release of {} bytes exceeds read grant of {} bytes",
            used,
            self.buf.len()
        );

        let side = &self.ring.read.value;
        debug_assert_eq!(side.tail.load(Ordering::Relaxed), self.token);

        let end = self.token.wrapping_add(used);
        if used < self.buf.len() {
            side.head.store(end, Ordering::Relaxed);
        }
        // Release: pembacaan region harus selesai sebelum producer boleh menimpanya
        side.tail.store(end, Ordering::Release);
        self.finished = true;
    }
}

impl Deref for ReadGrant<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf
    }
}

impl Drop for ReadGrant<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.ring
            .read
            .value
            .head
            .store(self.token, Ordering::Relaxed);
        if !self.buf.is_empty() {
            tracing::debug!(
                token = self.token,
                len = self.buf.len(),
                "read grant dropped without release, bytes stay readable"
            );
        }
    }
}

impl fmt::Debug for ReadGrant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadGrant")
            .field("token", &self.token)
            .field("len", &self.buf.len())
            .field("remaining", &self.remaining)
            .finish()
    }
}
