use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Confidence at or above which a recognition may be sent without confirmation.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.85;

/// Which side sits at the bottom of the diagram.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum BoardOrientation {
    White,
    Black,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SquareConfidence {
    pub square: String,
    pub piece: Option<String>,
    pub confidence: f64,
}

/// Output of a recognition backend, stamped with its source candidate by the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedPosition {
    /// Square name ("e4") to piece symbol ("K", "p", ...).
    pub piece_placement: BTreeMap<String, String>,
    pub fen: Option<String>,
    pub orientation: BoardOrientation,
    /// In `[0, 1]`.
    pub overall_confidence: f64,
    #[serde(default)]
    pub square_confidences: Vec<SquareConfidence>,
    pub source_candidate_id: Option<String>,
    pub side_to_move: Option<String>,
    pub annotation: Option<String>,
}

impl RecognizedPosition {
    pub fn is_high_confidence(&self) -> bool {
        self.overall_confidence >= HIGH_CONFIDENCE_THRESHOLD
    }

    pub fn piece_count(&self) -> usize {
        self.piece_placement.len()
    }

    /// Appends a note to the annotation, keeping any text the backend produced.
    pub fn annotate(&mut self, note: &str) {
        self.annotation = Some(match self.annotation.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}; {note}"),
            _ => note.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_confidence_boundary_is_inclusive() {
        let mut position = RecognizedPosition {
            overall_confidence: HIGH_CONFIDENCE_THRESHOLD,
            ..Default::default()
        };
        assert!(position.is_high_confidence());

        position.overall_confidence = 0.849;
        assert!(!position.is_high_confidence());
    }

    #[test]
    fn annotate_keeps_backend_text() {
        let mut position = RecognizedPosition {
            annotation: Some("Mate in 3".into()),
            ..Default::default()
        };
        position.annotate("invalid FEN dropped");

        assert_eq!(
            position.annotation.as_deref(),
            Some("Mate in 3; invalid FEN dropped")
        );
    }
}
