// src/core/mod.rs

pub mod config_loader;
pub mod dictionary;
pub mod expression;
pub mod generations;
pub mod materializer;
pub mod paths;
pub mod profile;
pub mod report;
pub mod runner;
pub mod status;
pub mod variables;
pub mod workspace;
