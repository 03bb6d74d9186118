//! Orchestration core for relaying chess diagrams from PDF books to a robotic e-board.
//!
//! Document rendering, diagram discovery, position recognition and the board transport are
//! collaborators behind [`recognition::RecognitionBackend`], [`recognition::ImageGetter`] and
//! [`board::BoardDriver`]. [`workflow::WorkflowController`] decides when to call them and keeps
//! concurrent calls safe and idempotent.

pub mod board;
pub mod fen;
pub mod models;
pub mod recognition;
pub mod selection;
pub mod settings;
pub mod utils;
pub mod workflow;

pub use board::{BoardDriver, MockBoardConfig, MockBoardDriver};
pub use models::{
    BoardOrientation, BoundingBox, ConnectionStatus, DeviceInfo, DiagramCandidate, DiagramType,
    RecognizedPosition, SetPositionResult, SetPositionStatus, ViewportState,
};
pub use recognition::{ImageGetter, RecognitionBackend};
pub use selection::select_topmost_visible;
pub use settings::{SettingsStore, WorkflowSettings};
pub use utils::logging::init_logging;
pub use workflow::{
    SendFailure, WorkflowContext, WorkflowController, WorkflowObserver, WorkflowState,
};
