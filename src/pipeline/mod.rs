// Stage wiring: blob key layout, stage events, per-record processing and the in-process chain

pub mod event;
pub mod keys;
pub mod orchestrator;
pub mod processing;

pub use orchestrator::{PipelineOrchestrator, PipelineRunSummary};
