//! End-to-end tests for the `deb-install` binary.
//!
//! Each test runs the real binary with its config, data and `PATH`
//! directories pointed into a scratch directory, so nothing on the host is
//! read or changed.
//!
//! # Running
//!
//! ```sh
//! cargo test --test e2e
//! ```

mod harness;

mod cli;
mod errors;
