pub mod coordinator;
pub mod secrets;
pub mod state;

pub use coordinator::{CoordinatorConfig, SessionCoordinator};
pub use state::{Phase, SessionState, Update};
