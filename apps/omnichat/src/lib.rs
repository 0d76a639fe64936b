//! # omnichat (application crate)
//!
//! Library surface of the Omnichat binary, exposed so integration tests can
//! build the router in-process. The binary entry point lives in `main.rs`.

pub mod api;
pub mod cli;
pub mod config;
