//! Routing session
//!
//! A session owns everything one routing run needs: the routing flag, the
//! controller writing it, the dual router with both playback streams, the
//! capture stream feeding it, and a supervisor thread that ends the session
//! on the first runtime device fault.
//!
//! ```text
//!   hook thread                capture thread            playback threads
//!  ┌────────────┐   writes    ┌──────────────┐  push    ┌────────────────┐
//!  │ key_handler├──▶ flag ◀───┤  DualRouter  ├────────▶ │ sink A │ sink B│
//!  └────────────┘     reads   └──────────────┘          └────────────────┘
//!                                     │ faults
//!                                     ▼
//!                               supervisor ──▶ Failed { reason }
//! ```

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::{AudioBackend, AudioFormat, AudioStream, StreamMonitor};
use crate::callback::shield;
use crate::constants;
use crate::error::AudioError;
use crate::hotkey::{KeyEventHandler, KeyboardEvent};
use crate::routing::{
    DualRouter, Route, RouterStats, RoutingController, RoutingState, RunningRoute,
    SharedHotkeySettings,
};

/// Device handles supplied by the collaborator
#[derive(Debug, Clone)]
pub struct SessionDevices<D> {
    pub input: D,
    pub output_a: D,
    pub output_b: D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Maximum audio held by each sink
    pub buffer_duration: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            buffer_duration: Duration::from_millis(constants::DEFAULT_BUFFER_MS),
        }
    }
}

/// Notifications for whatever presents the session to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Started,
    Routing(Route),
    Stopped,
    Failed { reason: String },
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Started => write!(f, "Started"),
            SessionStatus::Routing(route) => write!(f, "Routing: {route}"),
            SessionStatus::Stopped => write!(f, "Stopped"),
            SessionStatus::Failed { reason } => write!(f, "Failed: {reason}"),
        }
    }
}

pub type StatusCallback = Arc<dyn Fn(SessionStatus) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub router: RouterStats,
    /// Faults swallowed inside capture or playback callbacks
    pub callback_faults: u64,
}

#[derive(Default)]
struct Streams {
    capture: Option<Box<dyn AudioStream>>,
    route: Option<RunningRoute>,
}

/// State reachable from the hook thread and the supervisor
struct Shared {
    running: AtomicBool,
    streams: Mutex<Streams>,
    controller: Mutex<RoutingController>,
    settings: SharedHotkeySettings,
    status: StatusCallback,
}

impl Shared {
    /// Release all streams. Returns true for the call that actually did it.
    fn teardown(&self) -> bool {
        if !self.running.swap(false, Ordering::AcqRel) {
            return false;
        }

        let mut streams = self.streams.lock();
        if let Some(mut capture) = streams.capture.take() {
            capture.stop();
        }
        if let Some(mut route) = streams.route.take() {
            route.stop();
        }
        true
    }

    fn fail(&self, error: AudioError) {
        if self.teardown() {
            tracing::error!(%error, "routing session failed");
            self.emit(SessionStatus::Failed {
                reason: error.to_string(),
            });
        }
    }

    fn handle_key(&self, event: &KeyboardEvent) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }

        let settings = self.settings.get();
        let changed = self
            .controller
            .lock()
            .handle(event, &settings.hotkey, settings.mode);
        if let Some(route) = changed {
            self.emit(SessionStatus::Routing(route));
        }
    }

    fn emit(&self, status: SessionStatus) {
        let callback = &self.status;
        let _ = shield("status", || {
            callback(status);
            Ok(())
        });
    }
}

/// A running capture → dual router → two outputs pipeline
pub struct RoutingSession {
    shared: Arc<Shared>,
    state: RoutingState,
    router: Arc<DualRouter>,
    monitor: StreamMonitor,
    format: AudioFormat,
    shutdown_tx: Option<Sender<()>>,
    supervisor: Option<JoinHandle<()>>,
}

impl RoutingSession {
    /// Open output A, output B, then capture, and start routing to A.
    ///
    /// Any open failure releases whatever was already opened and is
    /// returned without emitting [`SessionStatus::Started`].
    pub fn start<B: AudioBackend>(
        backend: &B,
        devices: &SessionDevices<B::Device>,
        settings: SharedHotkeySettings,
        options: SessionOptions,
        status: StatusCallback,
    ) -> Result<Self, AudioError> {
        let format = backend.input_format(&devices.input)?;

        let (fault_tx, fault_rx) = bounded(constants::FAULT_CHANNEL_CAPACITY);
        let monitor = StreamMonitor::new(fault_tx);

        let state = RoutingState::new();
        let controller = RoutingController::new(state.clone());

        let mut route = RunningRoute::start(
            backend,
            &devices.output_a,
            &devices.output_b,
            &format,
            state.clone(),
            options.buffer_duration,
            &monitor,
        )?;

        let capture =
            match backend.open_input(&devices.input, &format, route.handler(), monitor.clone()) {
                Ok(capture) => capture,
                Err(e) => {
                    route.stop();
                    return Err(e);
                }
            };

        let router = route.router().clone();
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            streams: Mutex::new(Streams {
                capture: Some(capture),
                route: Some(route),
            }),
            controller: Mutex::new(controller),
            settings,
            status,
        });

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let supervisor_shared = shared.clone();
        let supervisor = thread::Builder::new()
            .name("session-supervisor".to_string())
            .spawn(move || supervise(supervisor_shared, fault_rx, shutdown_rx));
        let supervisor = match supervisor {
            Ok(handle) => handle,
            Err(e) => {
                shared.teardown();
                return Err(AudioError::StreamError(format!(
                    "failed to spawn session supervisor: {e}"
                )));
            }
        };

        tracing::info!(
            input = %backend.device_name(&devices.input),
            output_a = %backend.device_name(&devices.output_a),
            output_b = %backend.device_name(&devices.output_b),
            %format,
            buffer_ms = options.buffer_duration.as_millis() as u64,
            hotkey = %shared.settings.get(),
            "routing session started"
        );

        shared.emit(SessionStatus::Started);
        shared.emit(SessionStatus::Routing(Route::A));

        Ok(Self {
            shared,
            state,
            router,
            monitor,
            format,
            shutdown_tx: Some(shutdown_tx),
            supervisor: Some(supervisor),
        })
    }

    /// Subscriber for the keyboard hook. Events after stop are ignored.
    pub fn key_handler(&self) -> KeyEventHandler {
        let shared = self.shared.clone();
        Arc::new(move |event: &KeyboardEvent| shared.handle_key(event))
    }

    /// Feed one key transition directly
    pub fn handle_key(&self, event: &KeyboardEvent) {
        self.shared.handle_key(event);
    }

    pub fn route(&self) -> Route {
        self.state.load()
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn settings(&self) -> &SharedHotkeySettings {
        &self.shared.settings
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            router: self.router.stats(),
            callback_faults: self.monitor.callback_faults(),
        }
    }

    /// Release all devices. Idempotent; emits `Stopped` on the call that
    /// ends a running session.
    pub fn stop(&mut self) {
        if self.shared.teardown() {
            let stats = self.stats();
            tracing::info!(
                routed_a = stats.router.routed_a,
                routed_b = stats.router.routed_b,
                dropped_a = stats.router.dropped_a,
                dropped_b = stats.router.dropped_b,
                callback_faults = stats.callback_faults,
                "routing session stopped"
            );
            self.shared.emit(SessionStatus::Stopped);
        }

        self.shutdown_tx.take();
        if let Some(handle) = self.supervisor.take() {
            // A status callback on the supervisor may drop the session
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for RoutingSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn supervise(shared: Arc<Shared>, faults: Receiver<AudioError>, shutdown: Receiver<()>) {
    crossbeam_channel::select! {
        recv(faults) -> fault => {
            if let Ok(error) = fault {
                shared.fail(error);
            }
        }
        recv(shutdown) -> _ => {}
    }
    tracing::debug!("session supervisor exited");
}
