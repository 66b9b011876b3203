mod control;
mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::ScannerAgent;
pub use types::{ComponentState, RunSummary, ShutdownReason, TriggerHandles};
