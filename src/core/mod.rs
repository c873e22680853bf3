pub mod stages;
pub mod workflow;

pub use stages::{build_research_workflow, WorkflowOptions};
pub use workflow::{StageReport, Workflow, WorkflowOutcome, WorkflowStage, WorkflowState};
