use serde::{Deserialize, Serialize};

use super::BoundingBox;

/// What the reader currently shows, in page coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    /// 0-indexed dominant page.
    pub page_index: usize,
    /// 1.0 = 100%.
    pub zoom_scale: f64,
    pub viewport_bbox: BoundingBox,
    pub scroll_position_y: f64,
}
