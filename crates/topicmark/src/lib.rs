//! `topicmark` crate (library surface).
//!
//! The primary entrypoint is the `topicmark` binary (CLI + HTTP server).
//! The library module exists so the server wiring is testable and
//! embeddable without going through the CLI.

pub mod server;
