//! Keyboard hook enable/disable capability.
//!
//! The low-level keyboard hook that watches for trigger text lives outside
//! this crate, but the substitution engine must be able to suspend it while
//! synthesizing input: otherwise the synthesized keystrokes would re-enter
//! the hook and could trigger an endless recursive substitution. The hook
//! owner shares a [`HookState`] with the engine and checks
//! [`HookControl::is_enabled`] before processing events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Capability to flip the keyboard hook's enabled flag.
pub trait HookControl: Send + Sync {
    /// Set the enabled flag and return its previous value.
    fn set_enabled(&self, enabled: bool) -> bool;

    /// Current value of the enabled flag.
    fn is_enabled(&self) -> bool;
}

/// Shared enabled flag for the keyboard hook. Starts enabled.
#[derive(Debug)]
pub struct HookState {
    enabled: AtomicBool,
}

impl HookState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(true),
        })
    }
}

impl HookControl for HookState {
    fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::Relaxed)
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

/// Scoped suspension of the keyboard hook.
///
/// Disables the hook on construction and restores the exact prior state on
/// drop, so the hook can never remain disabled after the suspending scope
/// exits, whether it exits normally, through `?` or by panicking.
pub struct HookSuspension {
    hook: Arc<dyn HookControl>,
    previous: bool,
}

impl HookSuspension {
    pub fn engage(hook: Arc<dyn HookControl>) -> Self {
        let previous = hook.set_enabled(false);
        debug!(previous, "keyboard hook suspended");
        Self { hook, previous }
    }
}

impl Drop for HookSuspension {
    fn drop(&mut self) {
        self.hook.set_enabled(self.previous);
        debug!(restored = self.previous, "keyboard hook state restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_enabled() {
        let hook = HookState::new();
        assert!(hook.is_enabled());
    }

    #[test]
    fn test_set_enabled_returns_previous() {
        let hook = HookState::new();
        assert!(hook.set_enabled(false));
        assert!(!hook.set_enabled(false));
        assert!(!hook.set_enabled(true));
        assert!(hook.is_enabled());
    }

    #[test]
    fn test_suspension_restores_on_drop() {
        let hook = HookState::new();
        {
            let _suspension = HookSuspension::engage(hook.clone());
            assert!(!hook.is_enabled());
        }
        assert!(hook.is_enabled());
    }

    #[test]
    fn test_suspension_preserves_disabled_state() {
        let hook = HookState::new();
        hook.set_enabled(false);
        {
            let _suspension = HookSuspension::engage(hook.clone());
            assert!(!hook.is_enabled());
        }
        // was disabled before the suspension, must stay disabled after
        assert!(!hook.is_enabled());
    }

    #[test]
    fn test_suspension_restores_on_panic() {
        let hook = HookState::new();
        let hook_clone = hook.clone();
        let result = std::panic::catch_unwind(move || {
            let _suspension = HookSuspension::engage(hook_clone);
            panic!("synthesis failed");
        });
        assert!(result.is_err());
        assert!(hook.is_enabled());
    }
}
