// src/core/mod.rs

pub mod config_loader;
pub mod paths;
