mod heartbeat;
mod orchestrator;
mod runtime;
mod types;


pub use orchestrator::JscrOrchestrator;
pub use types::{ShutdownReason, StatusReport, TickReport};
