//! Navgate command line front end.
//!
//! Exposes the CLI modules for integration testing.

pub mod cli;
