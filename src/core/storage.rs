//! Backing storage: satu region anonymous mmap sebesar kapasitas ring.
//!
//! Region dialokasikan sekali saat ring dibuat dan tidak pernah di-resize.
//! Opsional: page di-lock ke RAM (`mlock`) supaya callback real-time tidak
//! pernah kena page fault saat menulis ke buffer.

use memmap2::{MmapMut, MmapOptions};
use std::io;

/// Opsi alokasi storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageOptions {
    /// Lock semua page ke RAM setelah mapping (unix: `mlock`).
    pub lock_memory: bool,
    /// Pre-fault page saat mapping (Linux: `MAP_POPULATE`).
    pub populate: bool,
}

/// Region byte kontigu milik satu ring buffer.
///
/// Storage sendiri tidak tahu apa-apa soal cursor. Pemanggil (ring buffer)
/// yang menjamin producer dan consumer hanya pernah menyentuh span yang
/// saling lepas.
pub(crate) struct Storage {
    mmap: MmapMut,
    ptr: *mut u8,
    locked: bool,
    // Satu cell per byte: loom melacak akses ke bytes lewat sini
    #[cfg(feature = "loom")]
    shadow: Box<[loom::cell::UnsafeCell<()>]>,
}

// SAFETY: Storage aman untuk Send/Sync karena:
// - Pointer menunjuk ke mapping milik `mmap` yang hidup selama Storage hidup
// - Akses ke byte selalu lewat span yang dibagi oleh cursor ring buffer,
//   producer dan consumer tidak pernah memegang span yang overlap
unsafe impl Send for Storage {}
unsafe impl Sync for Storage {}

impl Storage {
    /// Map `len` bytes anonymous memory.
    pub(crate) fn map(len: usize, options: StorageOptions) -> io::Result<Self> {
        let mut mmap_options = MmapOptions::new();
        mmap_options.len(len);
        if options.populate {
            mmap_options.populate();
        }

        let mut mmap = mmap_options.map_anon()?;
        let ptr = mmap.as_mut_ptr();

        let locked = if options.lock_memory {
            lock_pages(ptr, len)?;
            true
        } else {
            false
        };

        Ok(Self {
            mmap,
            ptr,
            locked,
            #[cfg(feature = "loom")]
            shadow: (0..len).map(|_| loom::cell::UnsafeCell::new(())).collect(),
        })
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Span writable `[offset, offset + len)`.
    ///
    /// # Safety
    /// Span harus berada di dalam storage dan tidak boleh overlap dengan span
    /// lain yang sedang dipinjam (oleh producer maupun consumer).
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slice_mut(&self, offset: usize, len: usize) -> &mut [u8] {
        debug_assert!(offset + len <= self.len());
        std::slice::from_raw_parts_mut(self.ptr.add(offset), len)
    }

    /// Span read-only `[offset, offset + len)`.
    ///
    /// # Safety
    /// Span harus berada di dalam storage dan tidak boleh sedang dipinjam
    /// writable oleh pihak lain.
    #[inline(always)]
    pub(crate) unsafe fn slice(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset + len <= self.len());
        std::slice::from_raw_parts(self.ptr.add(offset), len)
    }
}

// Model checking: producer dan consumer mencatat akses ke span yang mereka
// pegang. Tanpa happens-before dari pasangan Release/Acquire cursor, loom
// melaporkan akses ini sebagai data race.
#[cfg(feature = "loom")]
impl Storage {
    pub(crate) fn track_write(&self, offset: usize, len: usize) {
        for cell in &self.shadow[offset..offset + len] {
            cell.with_mut(|_| ());
        }
    }

    pub(crate) fn track_read(&self, offset: usize, len: usize) {
        for cell in &self.shadow[offset..offset + len] {
            cell.with(|_| ());
        }
    }
}

#[cfg(not(feature = "loom"))]
impl Storage {
    #[inline(always)]
    pub(crate) fn track_write(&self, _offset: usize, _len: usize) {}

    #[inline(always)]
    pub(crate) fn track_read(&self, _offset: usize, _len: usize) {}
}

impl Drop for Storage {
    fn drop(&mut self) {
        if self.locked {
            unlock_pages(self.ptr, self.len());
        }
    }
}

#[cfg(unix)]
fn lock_pages(ptr: *mut u8, len: usize) -> io::Result<()> {
    // SAFETY: ptr..ptr+len adalah mapping yang baru saja dibuat
    let rc = unsafe { libc::mlock(ptr as *const libc::c_void, len) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn unlock_pages(ptr: *mut u8, len: usize) {
    // Gagal munlock tidak fatal, mapping tetap di-unmap oleh MmapMut
    unsafe {
        libc::munlock(ptr as *const libc::c_void, len);
    }
}

#[cfg(not(unix))]
fn lock_pages(_ptr: *mut u8, _len: usize) -> io::Result<()> {
    tracing::warn!("page locking not supported on this platform, continuing unlocked");
    Ok(())
}

#[cfg(not(unix))]
fn unlock_pages(_ptr: *mut u8, _len: usize) {}
