//! Configuration module for the reputation server.
//! Reads settings from the environment and wires the engine to its store.
mod dependencies;

pub use dependencies::{Dependencies, Settings};
