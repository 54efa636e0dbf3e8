//! Scripted fakes for driving the recording controller in tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use recordify::application::ports::{
    AcquisitionError, ArtifactStore, CaptureConstraints, CaptureDevice, CaptureEvent,
    CaptureEventSender, CaptureStream, NotificationError, NotificationLevel, Notifier, SaveError,
    SaveReceipt,
};
use recordify::application::{ControllerConfig, RecordingController};
use recordify::domain::recording::{AudioArtifact, AudioMimeType};

pub type TestController = RecordingController<FakeDevice, FakeStore, RecordingNotifier>;

/// Build a controller over fresh fakes
pub fn controller() -> (TestController, FakeDevice, FakeStore, RecordingNotifier) {
    let device = FakeDevice::default();
    let store = FakeStore::default();
    let notifier = RecordingNotifier::default();
    let controller = RecordingController::new(
        device.clone(),
        store.clone(),
        notifier.clone(),
        ControllerConfig::default(),
    );
    (controller, device, store, notifier)
}

/// Let spawned tasks run until `condition` holds
pub async fn settle_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Let spawned tasks drain their queues
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock without landing on a tick boundary
pub async fn advance_secs(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

/// What the next access request does
#[derive(Debug, Clone)]
pub enum Acquire {
    Grant,
    Fail(AcquisitionError),
    /// Access is granted but starting the capture session fails
    GrantFailingStart,
}

#[derive(Default)]
struct DeviceState {
    script: Mutex<VecDeque<Acquire>>,
    gate: Mutex<Option<Arc<Notify>>>,
    taps: Mutex<Vec<StreamTap>>,
    requests: AtomicUsize,
}

/// Capture device following a script of outcomes, granting by default
#[derive(Clone, Default)]
pub struct FakeDevice {
    state: Arc<DeviceState>,
}

impl FakeDevice {
    pub fn push(&self, outcome: Acquire) {
        self.state.script.lock().unwrap().push_back(outcome);
    }

    /// Hold access requests until the returned gate is notified
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.state.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Tap on the most recently granted stream
    pub fn tap(&self) -> StreamTap {
        self.state
            .taps
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no stream granted")
    }

    pub fn taps(&self) -> Vec<StreamTap> {
        self.state.taps.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptureDevice for FakeDevice {
    async fn request_access(
        &self,
        _constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, AcquisitionError> {
        self.state.requests.fetch_add(1, Ordering::SeqCst);
        let gate = self.state.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let outcome = self
            .state
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Acquire::Grant);
        let fail_start = match outcome {
            Acquire::Grant => false,
            Acquire::GrantFailingStart => true,
            Acquire::Fail(e) => return Err(e),
        };

        let tap = StreamTap::default();
        tap.state.fail_start.store(fail_start, Ordering::SeqCst);
        self.state.taps.lock().unwrap().push(tap.clone());
        Ok(Box::new(FakeStream { tap }))
    }
}

#[derive(Default)]
struct TapState {
    sender: Mutex<Option<CaptureEventSender>>,
    fail_start: AtomicBool,
    hold_finalize: AtomicBool,
    paused: AtomicBool,
    stop_calls: AtomicUsize,
    tracks_stopped: AtomicUsize,
}

/// Test-side view of a granted stream
#[derive(Clone, Default)]
pub struct StreamTap {
    state: Arc<TapState>,
}

impl StreamTap {
    /// Deliver a data fragment as the device would
    pub fn emit(&self, bytes: &[u8]) {
        if let Some(sender) = self.state.sender.lock().unwrap().as_ref() {
            let _ = sender.send(CaptureEvent::DataAvailable(bytes.to_vec()));
        }
    }

    /// Finalize from the device side without a stop request
    pub fn finalize_unprompted(&self) {
        if let Some(sender) = self.state.sender.lock().unwrap().as_ref() {
            let _ = sender.send(CaptureEvent::Finalized);
        }
    }

    /// Report a mid-capture device failure
    pub fn fail(&self, error: AcquisitionError) {
        if let Some(sender) = self.state.sender.lock().unwrap().take() {
            let _ = sender.send(CaptureEvent::Failed(error));
        }
    }

    /// Drop the event sender without finalizing, as a crashed device would
    pub fn cut_off(&self) {
        self.state.sender.lock().unwrap().take();
    }

    /// Never deliver the finalize event on stop
    pub fn hold_finalize(&self) {
        self.state.hold_finalize.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.state.stop_calls.load(Ordering::SeqCst)
    }

    pub fn tracks_stopped(&self) -> bool {
        self.state.tracks_stopped.load(Ordering::SeqCst) > 0
    }

    pub fn tracks_stop_calls(&self) -> usize {
        self.state.tracks_stopped.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    tap: StreamTap,
}

#[async_trait]
impl CaptureStream for FakeStream {
    fn mime_type(&self) -> AudioMimeType {
        AudioMimeType::Webm
    }

    async fn start(&mut self, events: CaptureEventSender) -> Result<(), AcquisitionError> {
        if self.tap.state.fail_start.load(Ordering::SeqCst) {
            return Err(AcquisitionError::Unavailable("recorder failed".into()));
        }
        *self.tap.state.sender.lock().unwrap() = Some(events);
        Ok(())
    }

    fn pause(&mut self) {
        self.tap.state.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.tap.state.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.tap.state.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.tap.state.hold_finalize.load(Ordering::SeqCst) {
            return;
        }
        if let Some(sender) = self.tap.state.sender.lock().unwrap().as_ref() {
            let _ = sender.send(CaptureEvent::Finalized);
        }
    }

    fn stop_tracks(&mut self) {
        self.tap.state.tracks_stopped.fetch_add(1, Ordering::SeqCst);
        self.tap.state.sender.lock().unwrap().take();
    }
}

/// Copy of what was handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persisted {
    pub data: Vec<u8>,
    pub mime_type: AudioMimeType,
    pub duration_secs: u64,
}

#[derive(Default)]
struct StoreState {
    script: Mutex<VecDeque<Result<SaveReceipt, SaveError>>>,
    gate: Mutex<Option<Arc<Notify>>>,
    persisted: Mutex<Vec<Persisted>>,
    calls: AtomicUsize,
}

/// Artifact store following a script of results, succeeding by default
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<StoreState>,
}

impl FakeStore {
    pub fn push(&self, result: Result<SaveReceipt, SaveError>) {
        self.state.script.lock().unwrap().push_back(result);
    }

    /// Hold persist calls until the returned gate is notified
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.state.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn persisted(&self) -> Vec<Persisted> {
        self.state.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn persist(&self, artifact: &AudioArtifact) -> Result<SaveReceipt, SaveError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.state.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let result = self
            .state
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(SaveReceipt::default()));
        if result.is_ok() {
            self.state.persisted.lock().unwrap().push(Persisted {
                data: artifact.data().to_vec(),
                mime_type: artifact.mime_type(),
                duration_secs: artifact.duration().as_secs(),
            });
        }
        result
    }
}

/// One delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub level: NotificationLevel,
    pub message: String,
    pub key: Option<String>,
}

#[derive(Default)]
struct NotifierState {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

/// Notifier remembering everything it was asked to show
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<NotifierState>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.state.sent.lock().unwrap().clone()
    }

    /// Make every notify call fail after recording it
    pub fn fail(&self) {
        self.state.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        level: NotificationLevel,
        message: &str,
        key: Option<&str>,
    ) -> Result<(), NotificationError> {
        self.state.sent.lock().unwrap().push(Sent {
            level,
            message: message.to_string(),
            key: key.map(str::to_string),
        });
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Unavailable("no notification daemon".into()));
        }
        Ok(())
    }
}
