//! # Storage Module
//!
//! Persistent storage backends for the directory.

mod redb_directory;

pub use redb_directory::RedbDirectory;
