#![allow(dead_code)]

pub mod fake_driver;
pub mod fake_resolver;
pub mod surfaces;
