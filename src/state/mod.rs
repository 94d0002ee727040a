pub mod fingerprint;
pub mod normalize;
pub mod state_model;
