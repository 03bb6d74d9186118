//! Topmost-visible diagram selection.
//!
//! Pure policy run on every viewport event: among the candidates that are visible enough,
//! the one nearest the top of the page wins, leftmost on ties.

use std::cmp::Ordering;

use crate::models::{BoundingBox, DiagramCandidate};

pub const DEFAULT_MIN_VISIBILITY_FRACTION: f64 = 0.3;

/// Picks the active diagram for `viewport`.
///
/// The threshold is inclusive. Page numbers are ignored, so callers pass only the
/// candidates of the page being viewed. Further ties keep input order.
pub fn select_topmost_visible<'a>(
    candidates: &'a [DiagramCandidate],
    viewport: &BoundingBox,
    min_visibility_fraction: f64,
) -> Option<&'a DiagramCandidate> {
    candidates
        .iter()
        .filter(|candidate| candidate.bbox.visibility_fraction(viewport) >= min_visibility_fraction)
        .min_by(|a, b| reading_order(&a.bbox, &b.bbox))
}

fn reading_order(a: &BoundingBox, b: &BoundingBox) -> Ordering {
    a.y0.total_cmp(&b.y0).then_with(|| a.x0.total_cmp(&b.x0))
}
