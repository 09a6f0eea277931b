//! Register access for the clock control unit.
//!
//! Clock operations never touch hardware directly. They go through:
//!
//! - [`RegisterIo`]: synchronous 32-bit word access by byte offset
//! - [`CcuCommon`]: one clock's register offset plus the lock shared by
//!   every clock of the same unit
//! - [`RegisterBank`]: an in-memory [`RegisterIo`] for tests and simulation
//!
//! # Locking Model
//!
//! Every read-modify-write runs under the unit-wide lock so that two
//! writers sharing one control word never lose each other's bits. Plain
//! reads take no lock; each register read is a single atomic load, so a
//! reader sees either the whole old word or the whole new one.
//!
//! ```text
//!   set_rate ──┐                        ┌── set_parent
//!              ▼                        ▼
//!        ┌───────────── unit lock ─────────────┐
//!        │  read word → modify fields → write  │
//!        └─────────────────────────────────────┘
//!                         │
//!   recalc_rate ── read ──┴── (no lock)
//! ```

use ccu_common::CcuResult;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

/// Synchronous access to 32-bit control registers.
pub trait RegisterIo: Send + Sync {
    /// Read the word at byte `offset`.
    fn read(&self, offset: u32) -> u32;

    /// Write `value` to the word at byte `offset`.
    fn write(&self, offset: u32, value: u32);
}

/// In-memory register window.
///
/// Each word is an independent atomic, so concurrent readers never observe
/// a partially written value. Accesses outside the window or off word
/// alignment read as zero and drop writes, mirroring an unmapped bus.
pub struct RegisterBank {
    words: Box<[AtomicU32]>,
    /// Number of writes that landed in the window.
    writes: CachePadded<AtomicU64>,
}

impl std::fmt::Debug for RegisterBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterBank")
            .field("window", &self.window())
            .field("writes", &self.writes.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RegisterBank {
    /// Create a zeroed window of `window` bytes (rounded down to whole words).
    pub fn new(window: u32) -> Self {
        let words = (0..window / 4).map(|_| AtomicU32::new(0)).collect();
        Self {
            words,
            writes: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Window size in bytes.
    #[must_use]
    pub fn window(&self) -> u32 {
        u32::try_from(self.words.len() * 4).unwrap_or(u32::MAX)
    }

    /// Number of writes accepted so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    fn slot(&self, offset: u32) -> Option<&AtomicU32> {
        if offset % 4 != 0 {
            return None;
        }
        self.words.get(usize::try_from(offset / 4).ok()?)
    }
}

impl RegisterIo for RegisterBank {
    fn read(&self, offset: u32) -> u32 {
        if let Some(word) = self.slot(offset) {
            word.load(Ordering::Acquire)
        } else {
            warn!(offset, "register read outside window");
            0
        }
    }

    fn write(&self, offset: u32, value: u32) {
        if let Some(word) = self.slot(offset) {
            word.store(value, Ordering::Release);
            self.writes.fetch_add(1, Ordering::Release);
            trace!(offset, value, "register write");
        } else {
            warn!(offset, value, "register write outside window dropped");
        }
    }
}

/// A clock's view of its control register.
///
/// Clones share the same register window and lock.
#[derive(Clone)]
pub struct CcuCommon {
    io: Arc<dyn RegisterIo>,
    lock: Arc<Mutex<()>>,
    reg: u32,
}

impl std::fmt::Debug for CcuCommon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CcuCommon")
            .field("reg", &format_args!("{:#05x}", self.reg))
            .finish_non_exhaustive()
    }
}

impl CcuCommon {
    /// Bind register `reg` of `io`, guarded by `lock`.
    pub fn new(io: Arc<dyn RegisterIo>, lock: Arc<Mutex<()>>, reg: u32) -> Self {
        Self { io, lock, reg }
    }

    /// Byte offset of the control register.
    #[must_use]
    pub fn reg(&self) -> u32 {
        self.reg
    }

    /// Read the control word without taking the lock.
    #[inline]
    #[must_use]
    pub fn read(&self) -> u32 {
        self.io.read(self.reg)
    }

    /// Write the control word. Callers must hold [`CcuCommon::lock`].
    #[inline]
    pub(crate) fn write(&self, value: u32) {
        self.io.write(self.reg, value);
    }

    /// Acquire the unit-wide lock; released when the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        // The lock protects no data of its own, so a poisoned lock is still usable.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-modify-write the control word under the lock.
    ///
    /// Nothing is written if `f` fails. Returns the word that was written.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn update<F>(&self, f: F) -> CcuResult<u32>
    where
        F: FnOnce(u32) -> CcuResult<u32>,
    {
        let _guard = self.lock();
        let word = f(self.read())?;
        self.write(word);
        Ok(word)
    }
}
