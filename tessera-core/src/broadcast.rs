//! Process-wide broadcast mode.
//!
//! The flag mirrors the native library's single ambient setting: while it is
//! on, the dispatcher passes "broadcast allowed" to every native binary call;
//! while off, shape-mismatched operands fail instead of expanding. There is
//! no lock; concurrent use from multiple host threads must be serialized by
//! the caller, matching the engine's single-context model.

use std::sync::atomic::{AtomicBool, Ordering};

static BROADCAST_MODE: AtomicBool = AtomicBool::new(false);

/// Whether shape-mismatched binary operations may currently broadcast.
pub fn broadcast_enabled() -> bool {
    BROADCAST_MODE.load(Ordering::Relaxed)
}

/// Run `f` with broadcast mode enabled, then restore the previous state.
///
/// Restoration is a save/restore rather than a blind toggle, so nested scopes
/// compose and the flag survives a panic inside `f` with its prior value.
pub fn with_broadcast<R>(f: impl FnOnce() -> R) -> R {
    let _guard = BroadcastGuard::enable();
    f()
}

struct BroadcastGuard {
    prev: bool,
}

impl BroadcastGuard {
    fn enable() -> Self {
        Self {
            prev: BROADCAST_MODE.swap(true, Ordering::Relaxed),
        }
    }
}

impl Drop for BroadcastGuard {
    fn drop(&mut self) {
        BROADCAST_MODE.store(self.prev, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_restores_prior_state() {
        assert!(!broadcast_enabled());
        with_broadcast(|| {
            assert!(broadcast_enabled());
            with_broadcast(|| assert!(broadcast_enabled()));
            // A nested scope must not clear the outer one.
            assert!(broadcast_enabled());
        });
        assert!(!broadcast_enabled());
    }
}
