//! rn-scaffold: create and run React Native apps by driving external tooling
//! one step at a time.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod logging;
pub mod naming;
pub mod orchestrator;
pub mod presenter;
pub mod process;
pub mod progress;
