pub mod locator;
pub mod screen_model;
pub mod summary;
