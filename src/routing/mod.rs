//! Route selection and the dual buffered router

mod controller;
mod router;
mod settings;
mod state;

pub use controller::{RoutingController, RoutingMode};
pub use router::{Delivery, DualRouter, RouterStats, RunningRoute};
pub use settings::{HotkeySettings, SharedHotkeySettings};
pub use state::{Route, RoutingState};
