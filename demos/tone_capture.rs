//! Tone Capture - Simulasi callback audio real-time
//!
//! Thread "callback" berjalan per periode (seperti callback audio driver)
//! dan menulis frame sine S16LE stereo ke ring buffer. Callback tidak pernah
//! menunggu: kalau ring penuh, sisa frame dibuang dan dihitung sebagai overrun.
//! Thread utama menguras ring ke file dengan `drain_to`.
//!
//! Usage:
//!   cargo run --release --example tone_capture -- [options]
//!
//! Options:
//!   --out <path>        File output raw PCM (default: tone.raw)
//!   --seconds <N>       Durasi capture (default: 3)
//!   --freq <hz>         Frekuensi tone (default: 440)
//!   --capacity <size>   Kapasitas ring (default: 64k)
//!
//! Putar hasilnya dengan: aplay -f S16_LE -c 2 -r 48000 tone.raw

use std::f32::consts::TAU;
use std::fs::File;
use std::io::BufWriter;
use std::thread;
use std::time::{Duration, Instant};

use ringpipe::config::parse_size;
use ringpipe::stream::{drain_to, PumpControl, WaitStrategy};
use ringpipe::{Producer, RingBuffer};

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: usize = 2;
const BYTES_PER_FRAME: usize = CHANNELS * 2;
/// Periode callback (frames per callback)
const PERIOD_FRAMES: usize = 480;

#[derive(Clone)]
struct CaptureConfig {
    out: String,
    seconds: u32,
    freq: f32,
    capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            out: "tone.raw".to_string(),
            seconds: 3,
            freq: 440.0,
            capacity: 64 * 1024,
        }
    }
}

/// Statistik sisi callback
#[derive(Debug, Default)]
struct CallbackStats {
    callbacks: u64,
    frames_written: u64,
    frames_dropped: u64,
    overruns: u64,
}

/// Generator sine, state fase disimpan antar callback
struct ToneGenerator {
    phase: f32,
    step: f32,
}

impl ToneGenerator {
    fn new(freq: f32) -> Self {
        Self {
            phase: 0.0,
            step: TAU * freq / SAMPLE_RATE as f32,
        }
    }

    fn next_sample(&mut self) -> i16 {
        let sample = (self.phase.sin() * i16::MAX as f32 * 0.5) as i16;
        self.phase = (self.phase + self.step) % TAU;
        sample
    }

    /// Isi `buf` dengan frame utuh; sisa bytes yang bukan kelipatan frame diabaikan
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let frames = buf.len() / BYTES_PER_FRAME;
        for frame in buf[..frames * BYTES_PER_FRAME].chunks_exact_mut(BYTES_PER_FRAME) {
            let sample = self.next_sample().to_le_bytes();
            for channel in frame.chunks_exact_mut(2) {
                channel.copy_from_slice(&sample);
            }
        }
        frames
    }
}

/// Satu callback: tulis `PERIOD_FRAMES` frame, maksimal dua grant (wrap)
fn audio_callback(producer: &mut Producer, tone: &mut ToneGenerator, stats: &mut CallbackStats) {
    let mut pending = PERIOD_FRAMES;
    stats.callbacks += 1;

    for _ in 0..2 {
        if pending == 0 {
            break;
        }
        let mut grant = producer.reserve(pending * BYTES_PER_FRAME);
        let frames = tone.fill(&mut grant);
        grant.commit_prefix(frames * BYTES_PER_FRAME);
        pending -= frames;
        stats.frames_written += frames as u64;
    }

    if pending > 0 {
        stats.frames_dropped += pending as u64;
        stats.overruns += 1;
        // Fase tetap maju supaya tone tidak bergeser setelah overrun
        for _ in 0..pending {
            tone.next_sample();
        }
    }
}

fn run_callback_thread(mut producer: Producer, config: &CaptureConfig) -> CallbackStats {
    let period = Duration::from_secs_f64(PERIOD_FRAMES as f64 / SAMPLE_RATE as f64);
    let total_callbacks = config.seconds as u64 * SAMPLE_RATE as u64 / PERIOD_FRAMES as u64;

    let mut tone = ToneGenerator::new(config.freq);
    let mut stats = CallbackStats::default();
    let start = Instant::now();

    for i in 0..total_callbacks {
        let deadline = start + period * (i as u32);
        let now = Instant::now();
        if now < deadline {
            thread::sleep(deadline - now);
        }
        audio_callback(&mut producer, &mut tone, &mut stats);
    }

    stats
    // producer di-drop di sini: consumer tahu stream sudah selesai
}

fn run(config: &CaptureConfig) -> ringpipe::Result<()> {
    println!("🎵 Tone Capture - Real-Time Callback -> Ring -> File");
    println!("====================================================\n");
    println!("  Output:   {}", config.out);
    println!("  Duration: {}s", config.seconds);
    println!("  Tone:     {} Hz, {} Hz S16LE stereo", config.freq, SAMPLE_RATE);

    let (producer, mut consumer) = RingBuffer::create(config.capacity)?;
    println!("  Ring:     {} bytes\n", consumer.capacity());

    let file = BufWriter::new(File::create(&config.out)?);
    let control = PumpControl::new(WaitStrategy::Sleep(Duration::from_millis(2)), 4096);

    let callback = {
        let config = config.clone();
        thread::spawn(move || run_callback_thread(producer, &config))
    };

    let started = Instant::now();
    let drained = drain_to(&mut consumer, file, &control)?;
    let stats = match callback.join() {
        Ok(stats) => stats,
        Err(_) => {
            tracing::error!("callback thread panicked");
            CallbackStats::default()
        }
    };

    println!("📊 Results");
    println!("----------");
    println!("  Callbacks:      {}", stats.callbacks);
    println!("  Frames written: {}", stats.frames_written);
    println!("  Frames dropped: {}", stats.frames_dropped);
    println!("  Overruns:       {}", stats.overruns);
    println!("  Bytes to file:  {}", drained.bytes);
    println!("  Drain stalls:   {}", drained.stalls);
    println!("  Elapsed:        {:.2}s", started.elapsed().as_secs_f64());

    if stats.overruns == 0 {
        println!("\n  ✅ No overruns");
    } else {
        println!("\n  ⚠️  Overruns detected - increase --capacity");
    }

    Ok(())
}

fn parse_args() -> ringpipe::Result<CaptureConfig> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = CaptureConfig::default();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match args[i].as_str() {
            "--out" | "-o" => {
                if let Some(v) = value {
                    config.out = v;
                    i += 1;
                }
            }
            "--seconds" | "-s" => {
                if let Some(v) = value {
                    config.seconds = v.parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--freq" | "-f" => {
                if let Some(v) = value {
                    config.freq = v.parse().unwrap_or(440.0);
                    i += 1;
                }
            }
            "--capacity" | "-c" => {
                if let Some(v) = value {
                    config.capacity = parse_size("capacity", &v)?;
                    i += 1;
                }
            }
            "--help" => {
                println!("Tone Capture - real-time callback to file\n");
                println!("Usage: tone_capture [OPTIONS]\n");
                println!("Options:");
                println!("  -o, --out <PATH>       Raw PCM output (default: tone.raw)");
                println!("  -s, --seconds <N>      Capture duration (default: 3)");
                println!("  -f, --freq <HZ>        Tone frequency (default: 440)");
                println!("  -c, --capacity <SIZE>  Ring capacity (default: 64k)");
                println!("      --help             Show this help message");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    Ok(config)
}

fn main() {
    ringpipe::logging::init();

    let result = parse_args().and_then(|config| run(&config));
    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
