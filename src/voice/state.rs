//! Listening state shared between the command loop and the capture worker.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const IDLE: u8 = 0;
const CAPTURING: u8 = 1;

/// Whether a capture cycle is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Idle,
    Capturing,
}

/// Atomic listening flag.
///
/// Only [`SessionState::try_begin_capture`] moves `Idle -> Capturing`, and only
/// dropping the returned [`CaptureGuard`] moves it back, so each direction has
/// exactly one writer.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<AtomicU8>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ListeningState {
        match self.inner.load(Ordering::Acquire) {
            IDLE => ListeningState::Idle,
            _ => ListeningState::Capturing,
        }
    }

    /// Enter `Capturing` if currently `Idle`. `None` means a cycle is already running.
    pub fn try_begin_capture(&self) -> Option<CaptureGuard> {
        self.inner
            .compare_exchange(IDLE, CAPTURING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CaptureGuard {
                state: self.clone(),
            })
    }
}

/// Proof that this holder owns the current cycle. Returns the state to `Idle`
/// when dropped, including on early return or panic.
#[derive(Debug)]
pub struct CaptureGuard {
    state: SessionState,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.state.inner.store(IDLE, Ordering::Release);
    }
}
