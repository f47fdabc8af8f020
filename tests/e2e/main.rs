//! End-to-end tests for rn-scaffold.
//!
//! These tests run the real `rns` binary as a subprocess inside a temporary
//! workspace. External tools (`npm`, `npx`, `rsync`, `bundle`, `pod`) are
//! replaced by small shell scripts placed first on `PATH`, so the full
//! create and run flows can be exercised without Node or CocoaPods.
//!
//! # Running
//!
//! ```sh
//! cargo test --test e2e              # run all e2e tests
//! cargo test --test e2e -- --nocapture
//! ```
//!
//! Tests that rely on fake tools are unix-only.

mod harness;

mod cli;
mod errors;
