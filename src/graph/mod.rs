pub mod graph_model;
pub mod store;
