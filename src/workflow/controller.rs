use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, MutexGuard, RwLock},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    board::BoardDriver,
    fen::{positions_equal, validate_fen},
    models::{
        ConnectionStatus, DeviceInfo, DiagramCandidate, RecognizedPosition, SetPositionResult,
        ViewportState,
    },
    recognition::{ImageGetter, RecognitionBackend},
    selection::{select_topmost_visible, DEFAULT_MIN_VISIBILITY_FRACTION},
    settings::WorkflowSettings,
};

use super::{
    failure::SendFailure,
    observer::{ObserverRegistry, WorkflowObserver},
    state::{WorkflowContext, WorkflowState},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// A debounced recognition that has been scheduled but may not have fired yet.
struct PendingRecognition {
    candidate_id: String,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives the document → recognition → board workflow.
///
/// Cheap to clone; clones share one context. Recognition is single-flight behind
/// `recognition_lock` and board writes are serialized behind `send_lock`. The context mutex
/// is only held for short bookkeeping and never across a backend or driver call, and
/// `emergency_stop` takes no lock at all.
pub struct WorkflowController<B> {
    board: Arc<B>,
    backend: Arc<dyn RecognitionBackend>,
    context: Arc<Mutex<WorkflowContext>>,
    state: Arc<watch::Sender<WorkflowState>>,
    observers: Arc<ObserverRegistry>,
    recognition_lock: Arc<Mutex<()>>,
    send_lock: Arc<Mutex<()>>,
    debounce: Arc<StdMutex<Option<PendingRecognition>>>,
    image_getter: Arc<RwLock<Option<ImageGetter>>>,
    /// Restored whenever a document is closed.
    initial_settings: WorkflowSettings,
}

impl<B> Clone for WorkflowController<B> {
    fn clone(&self) -> Self {
        Self {
            board: Arc::clone(&self.board),
            backend: Arc::clone(&self.backend),
            context: Arc::clone(&self.context),
            state: Arc::clone(&self.state),
            observers: Arc::clone(&self.observers),
            recognition_lock: Arc::clone(&self.recognition_lock),
            send_lock: Arc::clone(&self.send_lock),
            debounce: Arc::clone(&self.debounce),
            image_getter: Arc::clone(&self.image_getter),
            initial_settings: self.initial_settings,
        }
    }
}

impl<B: BoardDriver> WorkflowController<B> {
    pub fn new(board: B, backend: Arc<dyn RecognitionBackend>, settings: WorkflowSettings) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        log_info!(
            "Workflow controller ready (backend: {}, auto-sync: {})",
            backend.name(),
            settings.auto_sync_enabled
        );

        Self {
            board: Arc::new(board),
            backend,
            context: Arc::new(Mutex::new(WorkflowContext::new(settings))),
            state: Arc::new(state),
            observers: Arc::new(ObserverRegistry::new()),
            recognition_lock: Arc::new(Mutex::new(())),
            send_lock: Arc::new(Mutex::new(())),
            debounce: Arc::new(StdMutex::new(None)),
            image_getter: Arc::new(RwLock::new(None)),
            initial_settings: settings,
        }
    }

    pub fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// Read-only snapshot for display.
    pub async fn context(&self) -> WorkflowContext {
        self.context.lock().await.clone()
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn add_observer(&self, observer: Arc<dyn WorkflowObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn WorkflowObserver>) {
        self.observers.remove(observer);
    }

    /// Default renderer for recognitions that are not handed one, including debounced
    /// auto-recognition.
    pub fn set_image_getter(&self, getter: ImageGetter) {
        *self
            .image_getter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(getter);
    }

    fn installed_image_getter(&self) -> Option<ImageGetter> {
        self.image_getter
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_state(&self, new_state: WorkflowState) {
        let mut previous = new_state;
        let changed = self.state.send_if_modified(|current| {
            if *current == new_state {
                return false;
            }
            previous = *current;
            *current = new_state;
            true
        });

        if changed {
            log_info!(
                "Workflow state: {} -> {}",
                previous.as_str(),
                new_state.as_str()
            );
        }
    }

    // Document events

    pub async fn on_pdf_opened(
        &self,
        path: impl Into<String>,
        candidates_by_page: HashMap<usize, Vec<DiagramCandidate>>,
    ) {
        self.cancel_pending_recognition();

        let path = path.into();
        let candidate_count: usize = candidates_by_page.values().map(Vec::len).sum();
        let session_id = {
            let mut context = self.context.lock().await;
            context.open_document(path.clone(), candidates_by_page)
        };

        log_info!("Opened {path} (session {session_id}, {candidate_count} diagram candidates)");
        self.set_state(WorkflowState::PdfLoaded);
    }

    /// Resets the context, including settings changed since construction. What the board
    /// was last sent is kept so reopening the same diagram does not resend it.
    pub async fn on_pdf_closed(&self) {
        self.cancel_pending_recognition();

        let session = {
            let mut context = self.context.lock().await;
            let session = context.session_label();
            context.close_document(self.initial_settings);
            session
        };

        log_info!("Closed document (session {session})");
        self.set_state(WorkflowState::Idle);
    }

    /// Re-runs the selection policy for a scroll or zoom. `page_candidates` must already be
    /// limited to the page in view. Repeated identical viewports are no-ops.
    pub async fn on_viewport_changed(
        &self,
        viewport: ViewportState,
        page_candidates: &[DiagramCandidate],
    ) {
        let selected = select_topmost_visible(
            page_candidates,
            &viewport.viewport_bbox,
            DEFAULT_MIN_VISIBILITY_FRACTION,
        )
        .cloned();

        let (changed, settings) = {
            let mut context = self.context.lock().await;
            context.viewport = Some(viewport);
            context.current_page = viewport.page_index;

            let selected_id = selected.as_ref().map(|c| c.candidate_id.as_str());
            let changed = context.active_candidate_id() != selected_id;
            if changed {
                context.set_active(selected.clone());
            }
            (changed, context.settings)
        };

        if !changed {
            return;
        }

        self.observers.active_diagram_changed(selected.as_ref());

        match selected {
            Some(candidate) => {
                log_debug!("Active diagram is now {}", candidate.candidate_id);
                self.set_state(WorkflowState::DiagramSelected);
                if settings.auto_sync_enabled {
                    self.schedule_recognition(candidate, settings.debounce_ms);
                }
            }
            None => {
                log_debug!("No diagram visible on page {}", viewport.page_index);
                self.set_state(WorkflowState::PdfLoaded);
            }
        }
    }

    /// Manual override of the active diagram. Never schedules recognition, and supersedes
    /// any pending auto-recognition.
    pub async fn select_diagram(&self, candidate: DiagramCandidate) {
        self.cancel_pending_recognition();

        {
            let mut context = self.context.lock().await;
            context.set_active(Some(candidate.clone()));
        }

        log_debug!("Diagram {} selected manually", candidate.candidate_id);
        self.observers.active_diagram_changed(Some(&candidate));
        self.set_state(WorkflowState::DiagramSelected);
    }

    // Debounced auto-recognition

    fn lock_debounce(&self) -> MutexGuard<'_, Option<PendingRecognition>> {
        match self.debounce.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn schedule_recognition(&self, candidate: DiagramCandidate, debounce_ms: u64) {
        let mut pending = self.lock_debounce();
        if let Some(previous) = pending.take() {
            previous.cancel_token.cancel();
            log_debug!("Superseded pending recognition for {}", previous.candidate_id);
        }

        let cancel_token = CancellationToken::new();
        let candidate_id = candidate.candidate_id.clone();
        let handle = tokio::spawn(self.clone().run_debounced(
            candidate,
            Duration::from_millis(debounce_ms),
            cancel_token.clone(),
        ));

        *pending = Some(PendingRecognition {
            candidate_id,
            cancel_token,
            handle,
        });
    }

    /// Cancels a debounce that has not fired yet. One already recognizing is left to finish.
    fn cancel_pending_recognition(&self) {
        if let Some(pending) = self.lock_debounce().take() {
            pending.cancel_token.cancel();
            log_debug!("Cancelled pending recognition for {}", pending.candidate_id);
        }
    }

    /// Cancels any pending debounce and waits for a recognition cycle already in flight.
    pub async fn shutdown(&self) {
        let pending = self.lock_debounce().take();
        if let Some(pending) = pending {
            pending.cancel_token.cancel();
            if let Err(err) = pending.handle.await {
                log_error!("Auto-recognition task failed to join: {err}");
            }
        }
    }

    // The candidate is captured when scheduled and is not re-checked against the active
    // diagram when the timer fires; superseding happens only through cancellation.
    async fn run_debounced(
        self,
        candidate: DiagramCandidate,
        delay: Duration,
        cancel_token: CancellationToken,
    ) {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                return;
            }
            _ = time::sleep(delay) => {}
        }

        let position = match self.recognize_diagram(Some(candidate), None).await {
            Ok(Some(position)) => position,
            Ok(None) => return,
            Err(err) => {
                log_error!("Auto-recognition skipped: {err:#}");
                self.observers.error(&format!("Auto-recognition skipped: {err:#}"));
                return;
            }
        };

        let min_confidence = self.context.lock().await.settings.min_confidence_for_auto;
        if !position.is_high_confidence() || position.overall_confidence < min_confidence {
            log_info!(
                "Not auto-sending {:?}: confidence {:.2}",
                position.source_candidate_id,
                position.overall_confidence
            );
            return;
        }

        let result = self.send_to_board(None, false).await;
        log_debug!("Auto-send finished with {}", result.status.as_str());
    }

    // Recognition

    /// Recognizes `candidate`, or the active diagram when `None`.
    ///
    /// Cached positions are returned without calling the backend. Backend failures are
    /// reported to observers and yield `Ok(None)`; `Err` means no image getter was available
    /// for a cache miss.
    pub async fn recognize_diagram(
        &self,
        candidate: Option<DiagramCandidate>,
        image_getter: Option<ImageGetter>,
    ) -> Result<Option<RecognizedPosition>> {
        let (candidate, session_id) = {
            let context = self.context.lock().await;
            match candidate.or_else(|| context.active_candidate.clone()) {
                Some(candidate) => (candidate, context.session_id),
                None => return Ok(None),
            }
        };
        let candidate_id = candidate.candidate_id.clone();

        let _recognition = self.recognition_lock.lock().await;

        let cached = {
            let mut context = self.context.lock().await;
            let cached = context.recognition_cache.get(&candidate_id).cloned();
            if let Some(position) = &cached {
                context.recognized_position = Some(position.clone());
            }
            cached
        };
        if let Some(position) = cached {
            log_debug!("Recognition cache hit for {candidate_id}");
            self.observers.position_recognized(&position);
            self.set_state(WorkflowState::PositionRecognized);
            return Ok(Some(position));
        }

        let getter = image_getter
            .or_else(|| self.installed_image_getter())
            .ok_or_else(|| anyhow!("no image getter available to render diagram {candidate_id}"))?;

        match self.run_backend(candidate, getter).await {
            Ok(mut position) => {
                position.source_candidate_id = Some(candidate_id.clone());
                drop_invalid_fen(&mut position);

                let stored = {
                    let mut context = self.context.lock().await;
                    if context.session_id == session_id {
                        context
                            .recognition_cache
                            .insert(candidate_id.clone(), position.clone());
                        context.recognized_position = Some(position.clone());
                        true
                    } else {
                        false
                    }
                };
                if !stored {
                    log_warn!(
                        "Document changed while recognizing {candidate_id}; result discarded"
                    );
                    return Ok(None);
                }

                log_info!(
                    "Recognized {candidate_id} with {} ({} pieces, confidence {:.2})",
                    self.backend.name(),
                    position.piece_count(),
                    position.overall_confidence
                );
                self.observers.position_recognized(&position);
                self.set_state(WorkflowState::PositionRecognized);
                Ok(Some(position))
            }
            Err(err) => {
                log_error!("Recognition error for {candidate_id}: {err:#}");
                self.observers.error(&format!("Recognition failed: {err:#}"));
                self.set_state(WorkflowState::Error);
                Ok(None)
            }
        }
    }

    /// Renders and classifies on the blocking pool so viewport handling and sends keep
    /// running. A panicking backend surfaces as a join error.
    async fn run_backend(
        &self,
        candidate: DiagramCandidate,
        getter: ImageGetter,
    ) -> Result<RecognizedPosition> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || {
            let image = getter(&candidate).context("failed to render diagram image")?;
            backend.recognize(&image)
        })
        .await
        .context("recognition worker join failed")?
    }

    // Board

    pub async fn connect_board(&self, device: Option<DeviceInfo>) -> ConnectionStatus {
        self.observers
            .connection_status_changed(ConnectionStatus::Connecting);

        match self.board.connect(device).await {
            Ok(status) => {
                log_info!("Board connection status: {status:?}");
                self.observers.connection_status_changed(status);
                status
            }
            Err(err) => {
                log_error!("Connection error: {err:#}");
                self.observers.error(&format!("Connection failed: {err:#}"));
                self.observers
                    .connection_status_changed(ConnectionStatus::Error);
                ConnectionStatus::Error
            }
        }
    }

    pub async fn disconnect_board(&self) {
        if let Err(err) = self.board.disconnect().await {
            log_error!("Disconnect error: {err:#}");
            self.observers.error(&format!("Disconnect failed: {err:#}"));
        }
        self.observers
            .connection_status_changed(self.board.connection_status());
    }

    /// Sends `fen`, or the last recognized position, to the board.
    ///
    /// Unless `require_confirmation` is set, a low-confidence recognition blocks the send.
    /// The gate reads the current recognition even when an explicit `fen` is given.
    pub async fn send_to_board(
        &self,
        fen: Option<&str>,
        require_confirmation: bool,
    ) -> SetPositionResult {
        let _send = self.send_lock.lock().await;

        let (target, last_sent_fen, recognized_high_confidence) = {
            let context = self.context.lock().await;
            let target = match fen {
                Some(fen) => Ok(fen.trim().to_string()),
                None => match &context.recognized_position {
                    None => Err(SendFailure::NoPositionAvailable),
                    Some(position) => position.fen.clone().ok_or(SendFailure::NoValidFen),
                },
            };
            (
                target,
                context.last_sent_fen.clone(),
                context
                    .recognized_position
                    .as_ref()
                    .map(RecognizedPosition::is_high_confidence),
            )
        };

        let target = match target {
            Ok(target) => target,
            Err(failure) => return self.refuse(failure),
        };
        if let Err(err) = validate_fen(&target, false) {
            return self.refuse(err.into());
        }

        if let Some(last) = &last_sent_fen {
            if positions_equal(&target, last) {
                log_debug!("Board already shows {last}");
                return SetPositionResult::success("Position already set");
            }
        }

        if self.board.connection_status() != ConnectionStatus::Connected {
            return self.refuse(SendFailure::NotConnected);
        }

        if !require_confirmation && recognized_high_confidence == Some(false) {
            return self.refuse(SendFailure::ConfirmationRequired);
        }

        self.set_state(WorkflowState::SendingToBoard);
        log_info!("Sending {target} to board");

        match self.board.set_position(&target).await {
            Ok(result) => {
                {
                    let mut context = self.context.lock().await;
                    if result.is_success() {
                        context.last_sent_fen = Some(target.clone());
                    }
                    context.last_send_result = Some(result.clone());
                }

                if result.is_success() {
                    self.set_state(WorkflowState::PositionSent);
                } else {
                    let message = result
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("Board returned {}", result.status.as_str()));
                    let failure = SendFailure::DriverRejected(message);
                    log_warn!("Board rejected {target}: {failure}");
                    self.set_state(WorkflowState::Error);
                    self.observers.error(&failure.to_string());
                }

                self.observers.position_sent(&result);
                result
            }
            Err(err) => {
                let failure = SendFailure::DriverException(format!("{err:#}"));
                log_error!("Send error: {failure}");
                self.set_state(WorkflowState::Error);

                let result = SetPositionResult::from(failure.clone());
                self.context.lock().await.last_send_result = Some(result.clone());
                self.observers
                    .error(&format!("Failed to send position: {failure}"));
                result
            }
        }
    }

    fn refuse(&self, failure: SendFailure) -> SetPositionResult {
        log_warn!("Not sending to board: {failure}");
        self.observers.error(&failure.to_string());
        failure.into()
    }

    /// Halts the board immediately. Bypasses the send lock so an in-flight move never
    /// delays it. Never fails to the caller.
    pub async fn emergency_stop(&self) {
        log_warn!("Emergency stop triggered");
        if let Err(err) = self.board.stop_motion().await {
            log_error!("Emergency stop failed: {err:#}");
            self.observers.error(&format!("Emergency stop failed: {err:#}"));
        }
    }

    // Settings and cache

    pub async fn settings(&self) -> WorkflowSettings {
        self.context.lock().await.settings
    }

    /// Disabling also drops a debounce that has not fired yet.
    pub async fn set_auto_sync(&self, enabled: bool) {
        self.context.lock().await.settings.auto_sync_enabled = enabled;
        if !enabled {
            self.cancel_pending_recognition();
        }
        log_info!("Auto-sync {}", if enabled { "enabled" } else { "disabled" });
    }

    pub async fn set_min_confidence(&self, confidence: f64) {
        self.context.lock().await.settings.min_confidence_for_auto = confidence.clamp(0.0, 1.0);
    }

    pub async fn set_debounce_ms(&self, debounce_ms: u64) {
        self.context.lock().await.settings.debounce_ms = debounce_ms;
    }

    pub async fn clear_cache(&self) {
        let cleared = {
            let mut context = self.context.lock().await;
            let cleared = context.recognition_cache.len();
            context.recognition_cache.clear();
            cleared
        };
        log_debug!("Cleared {cleared} cached recognitions");
    }

    pub async fn get_candidates_for_page(&self, page_index: usize) -> Vec<DiagramCandidate> {
        self.context
            .lock()
            .await
            .all_candidates
            .get(&page_index)
            .cloned()
            .unwrap_or_default()
    }
}

/// Backends may emit an empty or malformed FEN. Such a FEN is dropped so the send path
/// reports it instead of forwarding it to the board.
fn drop_invalid_fen(position: &mut RecognizedPosition) {
    let Some(fen) = position.fen.take() else {
        return;
    };

    let fen = fen.trim();
    if fen.is_empty() {
        position.annotate("recognition produced an empty FEN");
        return;
    }

    match validate_fen(fen, false) {
        Ok(()) => position.fen = Some(fen.to_string()),
        Err(err) => {
            log_warn!("Dropping invalid FEN '{fen}' from recognition: {err}");
            position.annotate(&format!("invalid FEN dropped: {err}"));
        }
    }
}
