//! Process-wide low-level keyboard hook
//!
//! Only one hook may be installed per process. Events flow from the hook
//! thread straight into the [`KeyEventDispatcher`] with no queue in between.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::dispatch::{KeyEventDispatcher, KeyEventHandler, SubscriptionId};
use crate::error::HookError;

#[cfg(windows)]
use super::win32 as platform;

static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Owner of the system-wide keyboard interceptor
pub struct KeyboardHook {
    dispatcher: Arc<KeyEventDispatcher>,
    thread: Option<platform::HookThread>,
}

impl KeyboardHook {
    pub fn new() -> Self {
        Self {
            dispatcher: Arc::new(KeyEventDispatcher::new()),
            thread: None,
        }
    }

    pub fn dispatcher(&self) -> &Arc<KeyEventDispatcher> {
        &self.dispatcher
    }

    pub fn subscribe(&self, handler: KeyEventHandler) -> SubscriptionId {
        self.dispatcher.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Install the hook. Calling it again on an installed hook is a no-op.
    pub fn install(&mut self) -> Result<(), HookError> {
        if self.thread.is_some() {
            return Ok(());
        }
        if HOOK_INSTALLED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(HookError::AlreadyInstalled);
        }

        match platform::spawn(self.dispatcher.clone()) {
            Ok(thread) => {
                self.thread = Some(thread);
                tracing::info!("keyboard hook installed");
                Ok(())
            }
            Err(e) => {
                HOOK_INSTALLED.store(false, Ordering::SeqCst);
                tracing::error!(error = %e, "keyboard hook installation failed");
                Err(e)
            }
        }
    }

    /// Remove the hook. A no-op when not installed.
    pub fn uninstall(&mut self) {
        if let Some(thread) = self.thread.take() {
            thread.stop();
            HOOK_INSTALLED.store(false, Ordering::SeqCst);
            tracing::info!("keyboard hook removed");
        }
    }

    pub fn is_installed(&self) -> bool {
        self.thread.is_some()
    }
}

impl Default for KeyboardHook {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(not(windows))]
mod platform {
    use std::sync::Arc;

    use crate::error::HookError;
    use crate::hotkey::dispatch::KeyEventDispatcher;

    pub struct HookThread;

    impl HookThread {
        pub fn stop(self) {}
    }

    pub fn spawn(_dispatcher: Arc<KeyEventDispatcher>) -> Result<HookThread, HookError> {
        Err(HookError::InstallationFailed(
            "low-level keyboard hooks are only available on Windows".to_string(),
        ))
    }
}
