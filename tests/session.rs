//! Routing session lifecycle against an in-memory audio backend

use cpal::SampleFormat;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mic_route_switch::audio::{
    AudioBackend, AudioChunk, AudioFormat, AudioStream, ChunkHandler, SharedSink, StreamMonitor,
};
use mic_route_switch::hotkey::{HotkeyDescriptor, Key, KeyboardEvent, Modifiers};
use mic_route_switch::{
    AudioError, HotkeySettings, Route, RoutingMode, RoutingSession, SessionDevices,
    SessionOptions, SessionStatus, SharedHotkeySettings, StatusCallback,
};

#[derive(Debug, Clone)]
struct MockDevice {
    name: String,
    available: bool,
}

fn device(name: &str) -> MockDevice {
    MockDevice {
        name: name.to_string(),
        available: true,
    }
}

fn unplugged(name: &str) -> MockDevice {
    MockDevice {
        name: name.to_string(),
        available: false,
    }
}

struct MockStream {
    open: Arc<AtomicUsize>,
    running: bool,
}

impl AudioStream for MockStream {
    fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Default)]
struct MockBackend {
    open: Arc<AtomicUsize>,
    capture: Mutex<Option<ChunkHandler>>,
    sinks: Mutex<Vec<SharedSink>>,
    monitors: Mutex<Vec<StreamMonitor>>,
}

impl MockBackend {
    fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn stream(&self) -> Box<dyn AudioStream> {
        self.open.fetch_add(1, Ordering::SeqCst);
        Box::new(MockStream {
            open: self.open.clone(),
            running: true,
        })
    }

    /// Push one chunk through the capture callback
    fn capture(&self, chunk: AudioChunk) {
        let handler = self.capture.lock().clone().expect("capture not opened");
        handler(chunk);
    }

    fn sink(&self, route: Route) -> SharedSink {
        let index = match route {
            Route::A => 0,
            Route::B => 1,
        };
        self.sinks.lock()[index].clone()
    }

    fn report_fault(&self, error: AudioError) {
        self.monitors.lock()[0].report(error);
    }
}

impl AudioBackend for MockBackend {
    type Device = MockDevice;

    fn device_name(&self, device: &MockDevice) -> String {
        device.name.clone()
    }

    fn input_format(&self, device: &MockDevice) -> Result<AudioFormat, AudioError> {
        if !device.available {
            return Err(AudioError::unavailable(&device.name, "disconnected"));
        }
        Ok(AudioFormat::new(1_000, 1, SampleFormat::I16))
    }

    fn open_input(
        &self,
        device: &MockDevice,
        _format: &AudioFormat,
        on_chunk: ChunkHandler,
        monitor: StreamMonitor,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        if !device.available {
            return Err(AudioError::unavailable(&device.name, "disconnected"));
        }
        *self.capture.lock() = Some(on_chunk);
        self.monitors.lock().push(monitor);
        Ok(self.stream())
    }

    fn open_output(
        &self,
        device: &MockDevice,
        _format: &AudioFormat,
        sink: SharedSink,
        monitor: StreamMonitor,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        if !device.available {
            return Err(AudioError::unavailable(&device.name, "exclusively locked"));
        }
        self.sinks.lock().push(sink);
        self.monitors.lock().push(monitor);
        Ok(self.stream())
    }
}

fn devices() -> SessionDevices<MockDevice> {
    SessionDevices {
        input: device("mic"),
        output_a: device("speakers"),
        output_b: device("cable"),
    }
}

fn recorder() -> (StatusCallback, Arc<Mutex<Vec<SessionStatus>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let callback: StatusCallback = Arc::new(move |status| sink.lock().push(status));
    (callback, log)
}

fn start(
    backend: &MockBackend,
    devices: &SessionDevices<MockDevice>,
    settings: SharedHotkeySettings,
) -> (Result<RoutingSession, AudioError>, Arc<Mutex<Vec<SessionStatus>>>) {
    let (callback, log) = recorder();
    let session = RoutingSession::start(
        backend,
        devices,
        settings,
        SessionOptions::default(),
        callback,
    );
    (session, log)
}

fn alt(is_down: bool) -> KeyboardEvent {
    KeyboardEvent {
        key: Key::LeftAlt,
        is_down,
        modifiers: Modifiers::NONE,
    }
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_start_opens_three_streams_and_routes_to_a() {
    let backend = MockBackend::default();
    let (session, log) = start(&backend, &devices(), SharedHotkeySettings::default());
    let session = session.unwrap();

    assert!(session.is_running());
    assert_eq!(session.route(), Route::A);
    assert_eq!(backend.open_handles(), 3);
    assert_eq!(
        *log.lock(),
        vec![SessionStatus::Started, SessionStatus::Routing(Route::A)]
    );
}

#[test]
fn test_unavailable_output_b_leaves_nothing_open() {
    let backend = MockBackend::default();
    let devices = SessionDevices {
        output_b: unplugged("cable"),
        ..devices()
    };
    let (session, log) = start(&backend, &devices, SharedHotkeySettings::default());

    let err = session.err().unwrap();
    assert!(err.is_device_unavailable());
    assert!(err.to_string().contains("cable"));
    assert_eq!(backend.open_handles(), 0);
    assert!(log.lock().is_empty());
}

#[test]
fn test_unavailable_input_leaves_nothing_open() {
    let backend = MockBackend::default();
    let devices = SessionDevices {
        input: unplugged("mic"),
        ..devices()
    };
    let (session, log) = start(&backend, &devices, SharedHotkeySettings::default());

    assert!(session.err().unwrap().is_device_unavailable());
    assert_eq!(backend.open_handles(), 0);
    assert!(log.lock().is_empty());
}

#[test]
fn test_hold_hotkey_moves_chunks_to_b() {
    let backend = MockBackend::default();
    let (session, log) = start(&backend, &devices(), SharedHotkeySettings::default());
    let session = session.unwrap();
    let handler = session.key_handler();

    backend.capture(AudioChunk::new(vec![1; 4], 0));
    handler(&alt(true));
    assert_eq!(session.route(), Route::B);
    backend.capture(AudioChunk::new(vec![2; 6], 1));
    handler(&alt(false));
    backend.capture(AudioChunk::new(vec![3; 2], 2));

    assert_eq!(backend.sink(Route::A).len(), 6);
    assert_eq!(backend.sink(Route::B).len(), 6);

    let stats = session.stats();
    assert_eq!(stats.router.routed_a, 2);
    assert_eq!(stats.router.routed_b, 1);
    assert_eq!(stats.router.dropped_a + stats.router.dropped_b, 0);

    assert_eq!(
        log.lock()[2..],
        [
            SessionStatus::Routing(Route::B),
            SessionStatus::Routing(Route::A)
        ]
    );
}

#[test]
fn test_settings_changes_apply_to_next_event() {
    let backend = MockBackend::default();
    let settings = SharedHotkeySettings::default();
    let (session, _log) = start(&backend, &devices(), settings.clone());
    let session = session.unwrap();

    settings.set(HotkeySettings {
        hotkey: HotkeyDescriptor::new(Key::Other(0x78), Modifiers::NONE),
        mode: RoutingMode::Toggle,
    });

    session.handle_key(&alt(true));
    assert_eq!(session.route(), Route::A);

    let f9 = |is_down| KeyboardEvent {
        key: Key::Other(0x78),
        is_down,
        modifiers: Modifiers::NONE,
    };
    session.handle_key(&f9(true));
    session.handle_key(&f9(false));
    assert_eq!(session.route(), Route::B);
    session.handle_key(&f9(true));
    assert_eq!(session.route(), Route::A);
}

#[test]
fn test_stop_is_idempotent_and_ignores_later_keys() {
    let backend = MockBackend::default();
    let (session, log) = start(&backend, &devices(), SharedHotkeySettings::default());
    let mut session = session.unwrap();
    let handler = session.key_handler();

    session.stop();
    session.stop();

    assert!(!session.is_running());
    assert_eq!(backend.open_handles(), 0);

    handler(&alt(true));
    assert_eq!(session.route(), Route::A);

    let stopped = log
        .lock()
        .iter()
        .filter(|s| **s == SessionStatus::Stopped)
        .count();
    assert_eq!(stopped, 1);
    assert_eq!(log.lock().last(), Some(&SessionStatus::Stopped));
}

#[test]
fn test_drop_releases_devices() {
    let backend = MockBackend::default();
    let (session, log) = start(&backend, &devices(), SharedHotkeySettings::default());
    drop(session.unwrap());

    assert_eq!(backend.open_handles(), 0);
    assert_eq!(log.lock().last(), Some(&SessionStatus::Stopped));
}

#[test]
fn test_runtime_fault_fails_session_once() {
    let backend = MockBackend::default();
    let (session, log) = start(&backend, &devices(), SharedHotkeySettings::default());
    let mut session = session.unwrap();

    backend.report_fault(AudioError::StreamError("device removed".into()));
    backend.report_fault(AudioError::StreamError("device removed again".into()));

    assert!(wait_for(|| !session.is_running()));
    assert!(wait_for(|| backend.open_handles() == 0));
    assert!(wait_for(|| log
        .lock()
        .iter()
        .any(|s| matches!(s, SessionStatus::Failed { .. }))));

    session.stop();

    let log = log.lock();
    let failures: Vec<_> = log
        .iter()
        .filter(|s| matches!(s, SessionStatus::Failed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
    match failures[0] {
        SessionStatus::Failed { reason } => assert!(reason.contains("device removed")),
        _ => unreachable!(),
    }
    assert!(!log.contains(&SessionStatus::Stopped));
}

#[test]
fn test_panicking_status_callback_does_not_break_routing() {
    let backend = MockBackend::default();
    let callback: StatusCallback = Arc::new(|status| {
        if let SessionStatus::Routing(Route::B) = status {
            panic!("ui went away");
        }
    });
    let session = RoutingSession::start(
        &backend,
        &devices(),
        SharedHotkeySettings::default(),
        SessionOptions::default(),
        callback,
    )
    .unwrap();

    session.handle_key(&alt(true));
    assert_eq!(session.route(), Route::B);
    session.handle_key(&alt(false));
    assert_eq!(session.route(), Route::A);
}

#[test]
fn test_session_subscribed_to_hook_dispatcher_follows_keys() {
    use mic_route_switch::hotkey::KeyboardHook;

    // Hook exists before the session, as the binary sets it up
    let hook = KeyboardHook::new();
    let backend = MockBackend::default();
    let (session, log) = start(&backend, &devices(), SharedHotkeySettings::default());
    let session = session.unwrap();
    let subscription = hook.subscribe(session.key_handler());

    hook.dispatcher().dispatch(alt(true));
    assert_eq!(session.route(), Route::B);
    hook.dispatcher().dispatch(alt(false));
    assert_eq!(session.route(), Route::A);

    assert!(hook.unsubscribe(subscription));
    hook.dispatcher().dispatch(alt(true));
    assert_eq!(session.route(), Route::A);
    assert_eq!(
        log.lock()[2..],
        [
            SessionStatus::Routing(Route::B),
            SessionStatus::Routing(Route::A)
        ]
    );
}
