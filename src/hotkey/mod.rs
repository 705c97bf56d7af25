//! Global hotkey detection
//!
//! A process-wide low-level keyboard hook turns every key transition into a
//! [`KeyboardEvent`] carrying live modifier state. Subscribers receive events
//! synchronously on the hook thread; [`HotkeyDescriptor::matches`] decides
//! whether an event is the configured hotkey.

mod descriptor;
mod dispatch;
mod hook;
mod keys;
#[cfg(windows)]
mod win32;

pub use descriptor::HotkeyDescriptor;
pub use dispatch::{KeyEventDispatcher, KeyEventHandler, SubscriptionId};
pub use hook::KeyboardHook;
pub use keys::{vk, Key, KeyboardEvent, Modifiers, UnknownKey};
