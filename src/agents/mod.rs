pub mod abstracting;
pub mod integration;
pub mod planning;
pub mod rag;
pub mod search;
pub mod transformation;
pub mod writing;

pub use abstracting::AbstractAgent;
pub use integration::IntegrationAgent;
pub use planning::PlanningAgent;
pub use rag::RagAgent;
pub use search::SearchAgent;
pub use transformation::TransformationAgent;
pub use writing::WritingAgent;
