pub mod agent_model;
pub mod ai_model;
pub mod error;
pub mod memory;
pub mod resolver;
