//! Routing controller: turns hotkey transitions into route changes

use serde::{Deserialize, Serialize};
use std::fmt;

use super::state::{Route, RoutingState};
use crate::hotkey::{HotkeyDescriptor, KeyboardEvent};

/// How hotkey presses drive the route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Route B while the hotkey is held, A otherwise
    #[default]
    Hold,
    /// Each hotkey press flips between A and B
    Toggle,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Hold => write!(f, "hold"),
            RoutingMode::Toggle => write!(f, "toggle"),
        }
    }
}

/// State machine over {A, B} writing the shared [`RoutingState`]
pub struct RoutingController {
    state: RoutingState,
    /// Toggle-mode memory, kept across presses
    toggled_to_b: bool,
}

impl RoutingController {
    /// Take control of `state`, resetting it to A
    pub fn new(state: RoutingState) -> Self {
        state.store(Route::A);
        Self {
            state,
            toggled_to_b: false,
        }
    }

    pub fn route(&self) -> Route {
        self.state.load()
    }

    /// Feed one key transition.
    ///
    /// Returns the new route when the event changed it. Events that do not
    /// match `hotkey` have no effect.
    pub fn handle(
        &mut self,
        event: &KeyboardEvent,
        hotkey: &HotkeyDescriptor,
        mode: RoutingMode,
    ) -> Option<Route> {
        if !hotkey.matches(event) {
            return None;
        }

        let next = match mode {
            RoutingMode::Hold => Route::from_is_b(event.is_down),
            RoutingMode::Toggle => {
                if !event.is_down {
                    return None;
                }
                self.toggled_to_b = !self.toggled_to_b;
                Route::from_is_b(self.toggled_to_b)
            }
        };

        let previous = self.state.store(next);
        if previous == next {
            return None;
        }

        tracing::info!(from = %previous, to = %next, %mode, "route changed");
        Some(next)
    }
}
