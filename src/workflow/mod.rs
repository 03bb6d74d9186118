pub mod controller;
pub mod failure;
pub mod observer;
pub mod state;

pub use controller::WorkflowController;
pub use failure::SendFailure;
pub use observer::{ObserverRegistry, WorkflowObserver};
pub use state::{WorkflowContext, WorkflowState};
