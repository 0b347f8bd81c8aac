// src/cli/handlers/mod.rs

// One module per CLI action. `script` handles every name that is not an action.

pub mod commons;
pub mod config;
pub mod profile;
pub mod projects;
pub mod run;
pub mod script;
pub mod status;
pub mod validate;
