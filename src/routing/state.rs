//! Active-sink flag shared between the hotkey side and the capture callback

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which output currently receives captured audio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Route {
    #[default]
    A,
    B,
}

impl Route {
    pub fn from_is_b(is_b: bool) -> Self {
        if is_b {
            Route::B
        } else {
            Route::A
        }
    }

    pub fn is_b(&self) -> bool {
        matches!(self, Route::B)
    }

    pub fn flipped(&self) -> Self {
        Route::from_is_b(!self.is_b())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::A => write!(f, "A"),
            Route::B => write!(f, "B"),
        }
    }
}

/// Single-writer, single-reader "active sink is B" flag.
///
/// Written from the hook thread, read once per chunk on the capture thread.
#[derive(Debug, Clone, Default)]
pub struct RoutingState {
    route_to_b: Arc<AtomicBool>,
}

impl RoutingState {
    /// New state routing to A
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Route {
        Route::from_is_b(self.route_to_b.load(Ordering::Acquire))
    }

    /// Store `route`, returning the previous one
    pub fn store(&self, route: Route) -> Route {
        Route::from_is_b(self.route_to_b.swap(route.is_b(), Ordering::AcqRel))
    }
}
