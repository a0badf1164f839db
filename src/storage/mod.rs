//! Storage layer for Archivist
//!
//! JSON document persistence with atomic and no-clobber writes.

pub mod file_io;

pub use file_io::{read_json_required, write_json_atomic, write_json_new};
