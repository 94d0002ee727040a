pub mod discovery;
pub mod parser;
pub mod scenario_model;
