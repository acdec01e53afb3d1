//! Per-invocation deploy session state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-flight guard: at most one deploy attempt is active regardless of
/// how many trigger events arrive.
///
/// A lock-free check-and-set rather than a queue: notifications that lose
/// the race are dropped, and the next event after the in-flight attempt
/// completes picks up the latest on-disk state.
#[derive(Clone, Default)]
pub struct DeployGuard {
    deploying: Arc<AtomicBool>,
}

impl DeployGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the in-flight slot. Returns false when a deploy is already
    /// running.
    pub fn try_acquire(&self) -> bool {
        self.deploying
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.deploying.store(false, Ordering::Release);
    }

    pub fn is_deploying(&self) -> bool {
        self.deploying.load(Ordering::Acquire)
    }
}

/// Process-local bookkeeping for one CLI invocation.
///
/// Lives for the whole invocation; the output counter is reset per
/// watch-triggered redeploy so each attempt's report starts fresh.
pub struct DeploySession {
    guard: DeployGuard,
    attempts: u32,
    emitted_lines: usize,
}

impl DeploySession {
    pub fn new() -> Self {
        Self {
            guard: DeployGuard::new(),
            attempts: 0,
            emitted_lines: 0,
        }
    }

    pub fn guard(&self) -> &DeployGuard {
        &self.guard
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn note_emitted(&mut self, lines: usize) {
        self.emitted_lines += lines;
    }

    pub fn emitted_lines(&self) -> usize {
        self.emitted_lines
    }

    /// Reset per-attempt output state before a watch-triggered redeploy.
    pub fn reset_output(&mut self) {
        self.emitted_lines = 0;
    }
}

impl Default for DeploySession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_exclusive_until_released() {
        let guard = DeployGuard::new();
        assert!(guard.try_acquire());
        assert!(guard.is_deploying());
        assert!(!guard.try_acquire());

        guard.release();
        assert!(!guard.is_deploying());
        assert!(guard.try_acquire());
    }

    #[test]
    fn clones_share_the_flag() {
        let guard = DeployGuard::new();
        let clone = guard.clone();
        assert!(guard.try_acquire());
        assert!(!clone.try_acquire());
        clone.release();
        assert!(guard.try_acquire());
    }

    #[test]
    fn session_resets_output_between_attempts() {
        let mut session = DeploySession::new();
        session.record_attempt();
        session.note_emitted(7);
        assert_eq!(session.emitted_lines(), 7);

        session.reset_output();
        session.record_attempt();
        assert_eq!(session.emitted_lines(), 0);
        assert_eq!(session.attempts(), 2);
    }
}
