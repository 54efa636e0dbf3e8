//! Recording controller
//!
//! Drives the [`RecordingSession`] state machine from intent operations
//! (start, pause, resume, stop, save) and from capture device events, and
//! exclusively owns the device stream, the event pump and the elapsed-time
//! ticker for the duration of a capture.
//!
//! Session state sits behind a `std::sync::Mutex` that is never held across
//! an `.await`. Background tasks only hold a `Weak` reference to it, so
//! dropping the last controller clone releases every resource through
//! `Drop`. Every mutation publishes a [`SessionSnapshot`] on a watch channel.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::domain::config::AppConfig;
use crate::domain::recording::{
    AudioArtifact, AudioMimeType, ElapsedTime, InvalidStateTransition, RecordingSession,
    RecordingState,
};

use super::ports::{
    AcquisitionError, ArtifactStore, CaptureConstraints, CaptureDevice, CaptureEvent,
    CaptureStream, NotificationLevel, Notifier, SaveError, SaveReceipt,
};
use super::ticker::ElapsedTicker;

/// Message shown after a successful save
pub const SAVE_SUCCESS_MESSAGE: &str = "Recording saved successfully!";

/// De-duplication key for save failures
pub const UPLOAD_ERROR_KEY: &str = "upload-error";

/// De-duplication key for device acquisition failures
pub const CAPTURE_ERROR_KEY: &str = "capture-error";

/// Errors from controller intent operations
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{0}")]
    InvalidState(#[from] InvalidStateTransition),

    #[error("{}", .0.user_message())]
    Acquisition(#[from] AcquisitionError),

    #[error("Recording controller has been torn down")]
    TornDown,
}

/// Controller tuning
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Parameters passed to the capture device
    pub constraints: CaptureConstraints,
    /// Elapsed counter resolution
    pub tick_period: Duration,
    /// How long stop() waits for the device to finalize
    pub finalize_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            tick_period: Duration::from_secs(1),
            finalize_timeout: Duration::from_secs(5),
        }
    }
}

impl ControllerConfig {
    /// Build from application configuration
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            constraints: CaptureConstraints {
                sample_rate: config.sample_rate(),
                channels: config.channels(),
                timeslice: config.timeslice_or_default(),
            },
            ..Default::default()
        }
    }
}

/// What the hosting UI renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: RecordingState,
    pub elapsed: ElapsedTime,
    /// Size of the finished artifact, when one exists
    pub artifact_size: Option<usize>,
    pub error: Option<String>,
    /// Whether a device stream is currently held
    pub capture_held: bool,
}

impl SessionSnapshot {
    /// Whether a playable artifact exists
    pub fn has_artifact(&self) -> bool {
        self.artifact_size.is_some()
    }
}

/// Result of a save attempt
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// Persisted; the session is back to idle
    Saved(SaveReceipt),
    /// Persisting failed; the session is back to stopped with the artifact kept
    Failed(SaveError),
    /// Nothing to save in the current state
    Skipped,
    /// The controller was torn down while the save was in flight
    Abandoned,
}

struct CaptureHandle {
    stream: Box<dyn CaptureStream>,
    mime_type: AudioMimeType,
    stopping: bool,
}

/// Device resources owned for the duration of one capture
struct CaptureResources {
    handle: Option<CaptureHandle>,
    pump: Option<JoinHandle<()>>,
    ticker: ElapsedTicker,
}

impl CaptureResources {
    fn new(tick_period: Duration) -> Self {
        Self {
            handle: None,
            pump: None,
            ticker: ElapsedTicker::new(tick_period),
        }
    }

    fn holds_capture(&self) -> bool {
        self.handle.is_some()
    }

    fn is_stopping(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.stopping)
    }

    fn mime_type(&self) -> AudioMimeType {
        self.handle
            .as_ref()
            .map(|h| h.mime_type)
            .unwrap_or_default()
    }

    fn stop_tracks(&mut self) {
        self.ticker.stop();
        if let Some(mut handle) = self.handle.take() {
            handle.stream.stop_tracks();
            debug!("device tracks stopped");
        }
    }

    /// Normal end of a capture: the pump has delivered everything, detach it
    fn finish(&mut self) {
        self.stop_tracks();
        self.pump = None;
    }

    /// Any other exit path: stop tracks and cancel the pump
    fn release(&mut self) {
        self.stop_tracks();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for CaptureResources {
    fn drop(&mut self) {
        self.release();
    }
}

struct Core {
    session: RecordingSession,
    resources: CaptureResources,
    attempt: u64,
    torn_down: bool,
}

impl Core {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.session.state(),
            elapsed: self.session.elapsed(),
            artifact_size: self.session.artifact().map(|a| a.size()),
            error: self.session.last_error().map(str::to_owned),
            capture_held: self.resources.holds_capture(),
        }
    }

    fn is_live(&self, attempt: u64) -> bool {
        !self.torn_down && self.attempt == attempt
    }

    /// Whether `attempt` is still waiting for its device
    fn is_requesting(&self, attempt: u64) -> bool {
        self.is_live(attempt) && self.session.state() == RecordingState::RequestingPermission
    }

    fn finalize(&mut self) {
        let mime_type = self.resources.mime_type();
        match self.session.finalize(mime_type) {
            Ok(artifact) => info!(
                size = artifact.size(),
                elapsed = %artifact.duration(),
                "recording finalized"
            ),
            Err(e) => warn!(error = %e, "finalize rejected"),
        }
        self.resources.finish();
    }
}

struct SessionCell {
    core: Mutex<Core>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionCell {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mutate the core and publish the resulting snapshot
    fn update<R>(&self, f: impl FnOnce(&mut Core) -> R) -> R {
        let mut core = self.lock();
        let result = f(&mut core);
        debug_assert!(
            !core.resources.holds_capture() || core.session.state().is_capturing(),
            "device stream held outside capture"
        );
        let next = core.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        result
    }

    fn tick(&self, epoch: u64) {
        self.update(|core| {
            if core.resources.ticker.is_current(epoch) && core.session.tick() {
                trace!(elapsed = %core.session.elapsed(), "tick");
            }
        });
    }

    fn append_chunk(&self, attempt: u64, chunk: Vec<u8>) {
        self.update(|core| {
            if !core.is_live(attempt) {
                return;
            }
            let len = chunk.len();
            if core.session.append_chunk(chunk) {
                trace!(bytes = len, pending = core.session.pending_chunks(), "chunk buffered");
            }
        });
    }

    fn finalize(&self, attempt: u64) {
        self.update(|core| {
            if core.is_live(attempt) && core.session.state().is_capturing() {
                core.finalize();
            }
        });
    }

    /// Capture ended without a finalize. Returns whether the failure was
    /// recorded and must be surfaced.
    fn interrupt(&self, attempt: u64, error: &AcquisitionError) -> bool {
        self.update(|core| {
            if !core.is_live(attempt) || !core.session.state().is_capturing() {
                return false;
            }
            if core.resources.is_stopping() {
                // stop() is waiting on this capture; keep what arrived
                core.finalize();
                return false;
            }
            let mime_type = core.resources.mime_type();
            match core.session.capture_interrupted(error.user_message(), mime_type) {
                Ok(Some(artifact)) => {
                    info!(size = artifact.size(), "partial recording kept")
                }
                Ok(None) => debug!("nothing captured before the interruption"),
                Err(e) => {
                    warn!(error = %e, "interruption rejected");
                    return false;
                }
            }
            core.resources.finish();
            true
        })
    }
}

fn start_ticker(cell: &Arc<SessionCell>, core: &mut Core) {
    let weak = Arc::downgrade(cell);
    core.resources.ticker.start(move |epoch| match weak.upgrade() {
        Some(cell) => {
            cell.tick(epoch);
            true
        }
        None => false,
    });
}

/// Forward device events into the session, in order, until finalize or
/// failure
async fn pump_events<N: Notifier>(
    weak: Weak<SessionCell>,
    notifier: Arc<N>,
    mut events: mpsc::UnboundedReceiver<CaptureEvent>,
    attempt: u64,
) {
    let failure = loop {
        let event = events.recv().await;
        let Some(cell) = weak.upgrade() else {
            return;
        };
        match event {
            Some(CaptureEvent::DataAvailable(chunk)) => cell.append_chunk(attempt, chunk),
            Some(CaptureEvent::Finalized) => {
                cell.finalize(attempt);
                return;
            }
            Some(CaptureEvent::Failed(error)) => break error,
            None => {
                break AcquisitionError::Interrupted(
                    "capture stream closed without finalizing".into(),
                )
            }
        }
    };

    let recorded = weak
        .upgrade()
        .is_some_and(|cell| cell.interrupt(attempt, &failure));
    if recorded {
        warn!(error = %failure, "capture interrupted");
        if let Err(e) = notifier
            .notify(
                NotificationLevel::Error,
                failure.user_message(),
                Some(CAPTURE_ERROR_KEY),
            )
            .await
        {
            warn!(error = %e, "notification failed");
        }
    }
}

enum StopPlan {
    Finalize {
        attempt: u64,
        pump: Option<JoinHandle<()>>,
    },
    AlreadyStopping,
    Reset,
}

struct Inner<D, S, N> {
    device: D,
    store: S,
    notifier: Arc<N>,
    config: ControllerConfig,
    cell: Arc<SessionCell>,
}

/// Recording controller.
///
/// Cheap to clone; clones share one session. Dropping the last clone
/// releases the device and cancels the ticker.
pub struct RecordingController<D, S, N>
where
    D: CaptureDevice,
    S: ArtifactStore,
    N: Notifier,
{
    inner: Arc<Inner<D, S, N>>,
}

impl<D, S, N> Clone for RecordingController<D, S, N>
where
    D: CaptureDevice,
    S: ArtifactStore,
    N: Notifier,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D, S, N> RecordingController<D, S, N>
where
    D: CaptureDevice,
    S: ArtifactStore,
    N: Notifier + 'static,
{
    /// Create a controller with an idle session
    pub fn new(device: D, store: S, notifier: N, config: ControllerConfig) -> Self {
        let core = Core {
            session: RecordingSession::new(),
            resources: CaptureResources::new(config.tick_period),
            attempt: 0,
            torn_down: false,
        };
        let (snapshots, _) = watch::channel(core.snapshot());
        let cell = Arc::new(SessionCell {
            core: Mutex::new(core),
            snapshots,
        });

        Self {
            inner: Arc::new(Inner {
                device,
                store,
                notifier: Arc::new(notifier),
                config,
                cell,
            }),
        }
    }

    fn cell(&self) -> &Arc<SessionCell> {
        &self.inner.cell
    }

    /// Current observable state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.cell().snapshots.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.cell().snapshots.subscribe()
    }

    /// Current state
    pub fn state(&self) -> RecordingState {
        self.cell().lock().session.state()
    }

    /// The finished artifact, if any
    pub fn artifact(&self) -> Option<Arc<AudioArtifact>> {
        self.cell().lock().session.artifact().cloned()
    }

    /// Number of chunks buffered and not yet finalized
    pub fn pending_chunks(&self) -> usize {
        self.cell().lock().session.pending_chunks()
    }

    /// Whether a device stream is held
    pub fn holds_capture(&self) -> bool {
        self.cell().lock().resources.holds_capture()
    }

    /// Whether the elapsed ticker is running
    pub fn ticker_running(&self) -> bool {
        self.cell().lock().resources.ticker.is_running()
    }

    /// Start a new recording from IDLE, ERROR or STOPPED.
    ///
    /// Any previous artifact is discarded. Resolves once the device is
    /// capturing, or with [`ControllerError::Acquisition`] after the session
    /// moved to ERROR.
    pub async fn start(&self) -> Result<(), ControllerError> {
        let attempt = self.cell().update(|core| {
            if core.torn_down {
                return Err(ControllerError::TornDown);
            }
            core.session.begin_capture()?;
            core.resources.release();
            core.attempt += 1;
            Ok(core.attempt)
        })?;
        info!(attempt, "requesting microphone access");

        match self
            .inner
            .device
            .request_access(&self.inner.config.constraints)
            .await
        {
            Ok(stream) => self.attach(attempt, stream).await,
            Err(e) => self.fail_acquisition(attempt, e).await,
        }
    }

    async fn attach(
        &self,
        attempt: u64,
        mut stream: Box<dyn CaptureStream>,
    ) -> Result<(), ControllerError> {
        let cell = self.cell();
        if !cell.lock().is_requesting(attempt) {
            stream.stop_tracks();
            debug!(attempt, "device acquired after the attempt ended; released");
            return Err(ControllerError::TornDown);
        }

        let (events, receiver) = mpsc::unbounded_channel();
        if let Err(e) = stream.start(events).await {
            stream.stop_tracks();
            return self.fail_acquisition(attempt, e).await;
        }

        let attached = cell.update(|core| {
            if !core.is_requesting(attempt) || core.session.access_granted().is_err() {
                stream.stop_tracks();
                return false;
            }
            let pump = tokio::spawn(pump_events(
                Arc::downgrade(cell),
                Arc::clone(&self.inner.notifier),
                receiver,
                attempt,
            ));
            core.resources.handle = Some(CaptureHandle {
                mime_type: stream.mime_type(),
                stream,
                stopping: false,
            });
            core.resources.pump = Some(pump);
            start_ticker(cell, core);
            true
        });

        if attached {
            info!(attempt, "recording started");
            Ok(())
        } else {
            debug!(attempt, "capture started after the attempt ended; released");
            Err(ControllerError::TornDown)
        }
    }

    async fn fail_acquisition(
        &self,
        attempt: u64,
        error: AcquisitionError,
    ) -> Result<(), ControllerError> {
        let recorded = self.cell().update(|core| {
            if !core.is_live(attempt) {
                return false;
            }
            core.resources.release();
            core.session.access_failed(error.user_message()).is_ok()
        });
        if !recorded {
            return Err(ControllerError::TornDown);
        }

        warn!(error = %error, "microphone access failed");
        self.notify(
            NotificationLevel::Error,
            error.user_message(),
            Some(CAPTURE_ERROR_KEY),
        )
        .await;
        Err(ControllerError::Acquisition(error))
    }

    /// Pause a running recording; the elapsed counter freezes
    pub fn pause(&self) -> Result<(), ControllerError> {
        self.cell().update(|core| {
            if core.torn_down {
                return Err(ControllerError::TornDown);
            }
            if core.resources.is_stopping() {
                return Err(stopping_rejection(core, "pause recording"));
            }
            core.session.pause()?;
            core.resources.ticker.stop();
            if let Some(handle) = core.resources.handle.as_mut() {
                handle.stream.pause();
            }
            info!(elapsed = %core.session.elapsed(), "recording paused");
            Ok(())
        })
    }

    /// Resume a paused recording; the elapsed counter continues
    pub fn resume(&self) -> Result<(), ControllerError> {
        let cell = self.cell();
        cell.update(|core| {
            if core.torn_down {
                return Err(ControllerError::TornDown);
            }
            if core.resources.is_stopping() {
                return Err(stopping_rejection(core, "resume recording"));
            }
            core.session.resume()?;
            if let Some(handle) = core.resources.handle.as_mut() {
                handle.stream.resume();
            }
            start_ticker(cell, core);
            info!(elapsed = %core.session.elapsed(), "recording resumed");
            Ok(())
        })
    }

    /// Stop the recording and wait for the artifact.
    ///
    /// From IDLE or ERROR this releases any dangling resources and resets
    /// the session to a clean IDLE.
    pub async fn stop(&self) -> Result<(), ControllerError> {
        let plan = self.cell().update(|core| {
            if core.torn_down {
                return Err(ControllerError::TornDown);
            }
            match core.session.state() {
                RecordingState::Recording | RecordingState::Paused => {
                    if core.resources.is_stopping() {
                        return Ok(StopPlan::AlreadyStopping);
                    }
                    core.resources.ticker.stop();
                    if let Some(handle) = core.resources.handle.as_mut() {
                        handle.stopping = true;
                        handle.stream.stop();
                    }
                    Ok(StopPlan::Finalize {
                        attempt: core.attempt,
                        pump: core.resources.pump.take(),
                    })
                }
                RecordingState::Idle | RecordingState::Error => {
                    core.resources.release();
                    core.session.reset_idle()?;
                    Ok(StopPlan::Reset)
                }
                current_state => Err(ControllerError::InvalidState(InvalidStateTransition {
                    current_state,
                    action: "stop recording".to_string(),
                })),
            }
        })?;

        match plan {
            StopPlan::Finalize { attempt, pump } => {
                debug!(attempt, "stop requested, waiting for finalize");
                if let Some(mut pump) = pump {
                    let timeout = self.inner.config.finalize_timeout;
                    if tokio::time::timeout(timeout, &mut pump).await.is_err() {
                        warn!(?timeout, "capture stream did not finalize in time");
                        pump.abort();
                    }
                }
                // No-op when the pump already finalized
                self.cell().finalize(attempt);
                Ok(())
            }
            StopPlan::AlreadyStopping => {
                debug!("stop already in progress, waiting for it");
                let mut snapshots = self.subscribe();
                // The stream is released once the first stop finalizes or
                // teardown runs
                let _ = snapshots.wait_for(|s| !s.capture_held).await;
                if self.cell().lock().torn_down {
                    return Err(ControllerError::TornDown);
                }
                Ok(())
            }
            StopPlan::Reset => {
                debug!("stop while idle; session reset");
                Ok(())
            }
        }
    }

    /// Save the finished artifact.
    ///
    /// A no-op unless the session is STOPPED with an artifact. On failure the
    /// session returns to STOPPED with the artifact kept so save can be
    /// retried; there is no automatic retry.
    pub async fn save(&self) -> SaveOutcome {
        let artifact = self.cell().update(|core| {
            if core.torn_down {
                return None;
            }
            core.session.begin_upload().ok().flatten()
        });
        let Some(artifact) = artifact else {
            debug!("nothing to save");
            return SaveOutcome::Skipped;
        };

        info!(size = artifact.size(), elapsed = %artifact.duration(), "saving recording");
        let result = self.inner.store.persist(&artifact).await;

        let applied = self.cell().update(|core| {
            if core.torn_down {
                return false;
            }
            match &result {
                Ok(_) => core.session.upload_succeeded().is_ok(),
                Err(e) => core.session.upload_failed(e.user_message()).is_ok(),
            }
        });
        if !applied {
            debug!("save resolved after teardown; ignored");
            return SaveOutcome::Abandoned;
        }

        match result {
            Ok(receipt) => {
                info!(id = ?receipt.id, "recording saved");
                self.notify(NotificationLevel::Success, SAVE_SUCCESS_MESSAGE, None)
                    .await;
                SaveOutcome::Saved(receipt)
            }
            Err(e) => {
                warn!(error = %e, network = e.is_network(), "saving recording failed");
                self.notify(NotificationLevel::Error, e.user_message(), Some(UPLOAD_ERROR_KEY))
                    .await;
                SaveOutcome::Failed(e)
            }
        }
    }

    /// Release the device and cancel the ticker, whatever the state.
    ///
    /// Afterwards every intent is rejected and in-flight operations resolve
    /// without touching the session. Idempotent.
    pub fn teardown(&self) {
        self.cell().update(|core| {
            if core.torn_down {
                return;
            }
            core.torn_down = true;
            core.resources.release();
            info!(state = %core.session.state(), "recording controller torn down");
        });
    }

    async fn notify(&self, level: NotificationLevel, message: &str, key: Option<&str>) {
        if let Err(e) = self.inner.notifier.notify(level, message, key).await {
            warn!(error = %e, "notification failed");
        }
    }
}

fn stopping_rejection(core: &Core, action: &str) -> ControllerError {
    ControllerError::InvalidState(InvalidStateTransition {
        current_state: core.session.state(),
        action: format!("{} while stopping", action),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_artifact_presence() {
        let snapshot = SessionSnapshot {
            artifact_size: Some(10),
            ..Default::default()
        };
        assert!(snapshot.has_artifact());
        assert!(!SessionSnapshot::default().has_artifact());
    }

    #[test]
    fn controller_config_from_app_config() {
        let config = ControllerConfig::from_app_config(&AppConfig::defaults());
        assert_eq!(config.constraints.channels, Some(1));
        assert_eq!(config.constraints.timeslice, Duration::from_millis(250));
        assert_eq!(config.tick_period, Duration::from_secs(1));
    }

    #[test]
    fn acquisition_error_displays_user_message() {
        let err = ControllerError::from(AcquisitionError::DeviceNotFound);
        assert!(err.to_string().starts_with("No microphone found"));
    }

    #[test]
    fn release_is_idempotent_without_resources() {
        let mut resources = CaptureResources::new(Duration::from_secs(1));
        resources.release();
        resources.release();
        assert!(!resources.holds_capture());
        assert!(!resources.is_stopping());
    }
}
