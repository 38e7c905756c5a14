//! Generation pipeline: gated provider client, section catalog, title stage,
//! fan-out orchestrator and convergence loop.

pub mod catalog;
pub mod client;
pub mod convergence;
pub mod gate;
pub mod orchestrator;
pub mod retry;
pub mod text;
pub mod title;

pub use catalog::{SectionTask, TaskBindings, SECTION_TASKS};
pub use client::{ClientConfig, GenerationClient};
pub use convergence::{ConvergenceConfig, ConvergenceLoop, ConvergenceOutcome};
pub use gate::{DispatchGate, GatePermit};
pub use orchestrator::{
    DocumentGenerator, GenerationReport, PipelineConfig, SectionOutcome, StartedGeneration,
};
pub use retry::RetryPolicy;
pub use title::TitleFilter;
