use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{DiagramCandidate, RecognizedPosition, SetPositionResult, ViewportState},
    settings::WorkflowSettings,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowState {
    #[default]
    Idle,
    PdfLoaded,
    DiagramSelected,
    PositionRecognized,
    SendingToBoard,
    PositionSent,
    /// Left by the next successful recognition or send.
    Error,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::PdfLoaded => "PdfLoaded",
            WorkflowState::DiagramSelected => "DiagramSelected",
            WorkflowState::PositionRecognized => "PositionRecognized",
            WorkflowState::SendingToBoard => "SendingToBoard",
            WorkflowState::PositionSent => "PositionSent",
            WorkflowState::Error => "Error",
        }
    }
}

/// Everything the controller knows about the open document and the board.
///
/// Owned by the controller; callers only ever see cloned snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowContext {
    /// Fresh per opened document; tags log lines.
    pub session_id: Option<Uuid>,
    pub current_pdf_path: Option<String>,
    pub current_page: usize,
    pub viewport: Option<ViewportState>,

    pub all_candidates: HashMap<usize, Vec<DiagramCandidate>>,
    pub active_candidate: Option<DiagramCandidate>,
    pub active_candidate_changed_at: Option<DateTime<Utc>>,

    pub recognized_position: Option<RecognizedPosition>,
    /// Keyed by `candidate_id`. Only cleared explicitly or with the document.
    pub recognition_cache: HashMap<String, RecognizedPosition>,

    pub last_sent_fen: Option<String>,
    pub last_send_result: Option<SetPositionResult>,

    pub settings: WorkflowSettings,
}

impl WorkflowContext {
    pub fn new(settings: WorkflowSettings) -> Self {
        Self {
            session_id: None,
            current_pdf_path: None,
            current_page: 0,
            viewport: None,
            all_candidates: HashMap::new(),
            active_candidate: None,
            active_candidate_changed_at: None,
            recognized_position: None,
            recognition_cache: HashMap::new(),
            last_sent_fen: None,
            last_send_result: None,
            settings,
        }
    }

    pub fn open_document(
        &mut self,
        path: String,
        candidates: HashMap<usize, Vec<DiagramCandidate>>,
    ) -> Uuid {
        self.clear_document();
        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.current_pdf_path = Some(path);
        self.all_candidates = candidates;
        session_id
    }

    /// Resets the context for a closed document, with `settings` as the new settings.
    /// Only what the board was last sent survives.
    pub fn close_document(&mut self, settings: WorkflowSettings) {
        self.clear_document();
        self.settings = settings;
    }

    fn clear_document(&mut self) {
        *self = Self {
            last_sent_fen: self.last_sent_fen.take(),
            last_send_result: self.last_send_result.take(),
            ..Self::new(self.settings)
        };
    }

    pub fn set_active(&mut self, candidate: Option<DiagramCandidate>) {
        self.active_candidate = candidate;
        self.active_candidate_changed_at = Some(Utc::now());
    }

    pub fn active_candidate_id(&self) -> Option<&str> {
        self.active_candidate
            .as_ref()
            .map(|candidate| candidate.candidate_id.as_str())
    }

    pub fn session_label(&self) -> String {
        self.session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "no-document".to_string())
    }
}

impl Default for WorkflowContext {
    fn default() -> Self {
        Self::new(WorkflowSettings::default())
    }
}
