pub mod controller;
pub mod state;

pub use controller::WorkflowController;
pub use state::{Phase, ResultOrigin, ValidationState, WorkflowState};
