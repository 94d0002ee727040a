pub mod agent;
pub mod browser;
pub mod cli;
pub mod controller;
pub mod graph;
pub mod report;
pub mod scenario;
pub mod screen;
pub mod state;
pub mod trace;
