use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::BoundingBox;

/// How the diagram is embedded in the page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum DiagramType {
    Raster,
    Vector,
    #[default]
    Unknown,
}

/// A diagram region discovered on a page. Immutable once created.
///
/// `candidate_id` is derived from the document fingerprint, the page and the box, so
/// re-discovering the same physical diagram yields the same id and the recognition cache hits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagramCandidate {
    /// 0-indexed.
    pub page_number: usize,
    pub bbox: BoundingBox,
    pub diagram_type: DiagramType,
    pub candidate_id: String,
}

impl DiagramCandidate {
    pub fn new(
        page_number: usize,
        bbox: BoundingBox,
        diagram_type: DiagramType,
        pdf_fingerprint: &str,
    ) -> Self {
        Self {
            page_number,
            bbox,
            diagram_type,
            candidate_id: Self::generate_id(page_number, &bbox, pdf_fingerprint),
        }
    }

    pub fn generate_id(page_number: usize, bbox: &BoundingBox, pdf_fingerprint: &str) -> String {
        let data = format!(
            "{pdf_fingerprint}:{page_number}:{:.2},{:.2},{:.2},{:.2}",
            bbox.x0, bbox.y0, bbox.x1, bbox.y1
        );
        let digest = Sha256::digest(data.as_bytes());
        digest
            .iter()
            .take(8)
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    /// Candidates are the same diagram when their ids match.
    pub fn same_diagram(&self, other: &DiagramCandidate) -> bool {
        self.candidate_id == other.candidate_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox {
            x0: 72.0,
            y0: 100.5,
            x1: 272.0,
            y1: 300.5,
        }
    }

    #[test]
    fn generated_id_is_stable_for_repeated_discovery() {
        let first = DiagramCandidate::new(3, bbox(), DiagramType::Raster, "abc123");
        let second = DiagramCandidate::new(3, bbox(), DiagramType::Raster, "abc123");

        assert_eq!(first.candidate_id, second.candidate_id);
        assert_eq!(first.candidate_id.len(), 16);
        assert!(first.candidate_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_id_differs_per_page_box_and_document() {
        let base = DiagramCandidate::generate_id(3, &bbox(), "abc123");

        let mut moved = bbox();
        moved.y0 += 1.0;

        assert_ne!(base, DiagramCandidate::generate_id(4, &bbox(), "abc123"));
        assert_ne!(base, DiagramCandidate::generate_id(3, &moved, "abc123"));
        assert_ne!(base, DiagramCandidate::generate_id(3, &bbox(), "def456"));
    }

    #[test]
    fn rediscovered_diagram_is_the_same_diagram() {
        let first = DiagramCandidate::new(3, bbox(), DiagramType::Raster, "abc123");
        let mut jittered = bbox();
        jittered.y1 += 0.004;
        let again = DiagramCandidate::new(3, jittered, DiagramType::Unknown, "abc123");
        let other_page = DiagramCandidate::new(4, bbox(), DiagramType::Raster, "abc123");

        assert!(first.same_diagram(&again));
        assert!(!first.same_diagram(&other_page));
    }

    #[test]
    fn sub_hundredth_jitter_maps_to_same_id() {
        let mut jittered = bbox();
        jittered.x0 += 0.001;

        assert_eq!(
            DiagramCandidate::generate_id(0, &bbox(), "doc"),
            DiagramCandidate::generate_id(0, &jittered, "doc")
        );
    }
}
