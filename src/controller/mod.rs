pub mod execute;
pub mod learn;
pub mod runner;
pub mod validate;
