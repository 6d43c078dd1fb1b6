//! src/pipeline/common/mod.rs
//!
//! Common utilities shared by pipeline workers and batch loader threads.

pub mod thread;
