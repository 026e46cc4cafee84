use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct LockState {
    in_progress: bool,
    last_run_at: Option<Instant>,
}

/// ドメインごとの「同期パスは同時に 1 つだけ」を保証する小さな状態。
///
/// `try_acquire` が返すガードを落とすと解放され、終了時刻が記録される。
#[derive(Debug, Default)]
pub struct SyncLock {
    state: Mutex<LockState>,
}

impl SyncLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn try_acquire(&self) -> Option<SyncGuard<'_>> {
        let mut state = self.state();
        if state.in_progress {
            return None;
        }
        state.in_progress = true;
        Some(SyncGuard { lock: self })
    }

    pub fn is_running(&self) -> bool {
        self.state().in_progress
    }

    pub fn last_run_at(&self) -> Option<Instant> {
        self.state().last_run_at
    }

    /// 直近のパス終了から `window` 以内なら true
    pub fn ran_within(&self, window: Duration) -> bool {
        self.last_run_at()
            .map_or(false, |at| at.elapsed() < window)
    }

    fn release(&self) {
        let mut state = self.state();
        state.in_progress = false;
        state.last_run_at = Some(Instant::now());
    }
}

#[must_use = "dropping the guard releases the lock immediately"]
pub struct SyncGuard<'a> {
    lock: &'a SyncLock,
}

impl SyncGuard<'_> {
    /// drop と同じく解放し、最終実行時刻を記録する
    pub fn release(self) {}
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
