pub mod adapters;
pub mod agents;
pub mod config;
pub mod core;
pub mod domain;
pub mod llm;
pub mod manifest;
pub mod retrieval;
pub mod utils;

pub use crate::adapters::{DuckDuckGoClient, LocalStorage};
pub use crate::config::{Cli, Command, RunSettings};
pub use crate::core::{
    build_research_workflow, Workflow, WorkflowOptions, WorkflowOutcome, WorkflowState,
};
pub use crate::manifest::Manifest;
pub use crate::utils::error::{FlowError, Result};
