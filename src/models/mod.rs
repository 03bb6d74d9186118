mod board;
mod diagram;
mod geometry;
mod position;
mod viewport;

pub use board::{ConnectionStatus, DeviceInfo, SetPositionResult, SetPositionStatus};
pub use diagram::{DiagramCandidate, DiagramType};
pub use geometry::BoundingBox;
pub use position::{
    BoardOrientation, RecognizedPosition, SquareConfidence, HIGH_CONFIDENCE_THRESHOLD,
};
pub use viewport::ViewportState;
