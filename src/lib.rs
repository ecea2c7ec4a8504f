//! ramvfs - a tiny file system living in one contiguous byte buffer
//!
//! File headers and data blocks are tagged records inside the arena;
//! a first-fit scan finds room for new ones.

pub mod cli;
pub mod observability;
pub mod vfs;
