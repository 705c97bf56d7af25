//! Callback boundary for code invoked by the audio and input subsystems
//!
//! Platform callbacks must always return normally: a panic unwinding into
//! the OS audio engine or the input hook chain is undefined behaviour, and
//! a hook that misbehaves gets unregistered by Windows. Every callback body
//! runs through [`shield`], which turns errors and panics into a
//! [`CallbackFault`] value.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::CallbackFault;

/// Run `body` at a callback boundary.
///
/// Faults are logged here and returned so the caller can count them.
pub fn shield<F>(context: &'static str, body: F) -> Result<(), CallbackFault>
where
    F: FnOnce() -> Result<(), CallbackFault>,
{
    let fault = match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(fault)) => fault,
        Err(payload) => CallbackFault::Panicked {
            context,
            message: panic_message(payload.as_ref()),
        },
    };

    tracing::error!(%fault, "fault swallowed at callback boundary");
    Err(fault)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
