//! src/pipeline/mod.rs
//!
//! This module implements the bounded producer/consumer `Pipeline`.
//!
//! Background workers repeatedly run a pluggable [`Producer`] and append what
//! it yields to a shared, soft-bounded buffer. Consumers pull from the buffer
//! without ever touching disk or decoder latency themselves.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────┐
//!                  │   Producer   │ (one production step, e.g. one file)
//!                  └──────┬───────┘
//!                         │ called repeatedly by
//!                         ↓
//!                   [Worker Threads] ←───── PipelineConfig (workers, capacity, idle)
//!                         │
//!                         │ wait for room, produce, append
//!                         ↓
//!                ┌──────────────────┐
//!                │  PipelineBuffer  │ (items + shared state + fault, one lock)
//!                └────────┬─────────┘
//!                         │ next(blocking) / next_timeout
//!                         ↓
//!                    ┌──────────┐
//!                    │ Consumer │ (training loop, or BatchLoader)
//!                    └────┬─────┘
//!                         │ optional
//!                         ↓
//!                  ┌─────────────┐
//!                  │ BatchLoader │ (collates samples into MiniBatches)
//!                  └─────────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/pipeline/
//! ├── mod.rs             # Public API exports + module-level architecture docs
//! ├── config.rs          # PipelineConfig, builder, BatchConfig and validation
//! ├── buffer.rs          # PipelineBuffer: lock, condition variables, fault
//! ├── loader.rs          # Producer trait, Production, Pipeline and worker loop
//! ├── batch.rs           # SampleSource and BatchLoader
//! ├── workers/
//! │   ├── mod.rs         # Module declarations
//! │   └── pool.rs        # Named worker threads joined on drop
//! └── common/
//!     ├── mod.rs         # Module declarations for shared utilities
//!     └── thread.rs      # Thread-local worker ID and RNG
//! ```
//!
//! # Example Usage
//!
//! ## Background workers:
//! ```ignore
//! let config = PipelineConfig::builder()
//!     .worker_count(4)
//!     .buffer_capacity(5)
//!     .build();
//! let pipeline = Pipeline::spawn(producer, state, config)?;
//!
//! while let Some(item) = pipeline.next(true) {
//!     train_step(item);
//! }
//! if let Some(fault) = pipeline.take_fault() {
//!     return Err(fault);
//! }
//! ```
//!
//! ## Synchronous (no threads):
//! ```ignore
//! let config = PipelineConfig::builder().worker_count(0).build();
//! let pipeline = Pipeline::spawn(producer, state, config)?;
//! let item = pipeline.next(false); // runs the producer on this thread
//! ```

pub mod batch;
pub mod buffer;
pub mod common;
pub mod config;
pub mod loader;
pub(crate) mod workers;

pub use batch::{BatchLoader, SampleSource};
pub use buffer::PipelineBuffer;
pub use common::thread::{current_worker_id, init_worker_rng, with_worker_rng};
pub use config::{BatchConfig, PipelineConfig, PipelineConfigBuilder};
pub use loader::{Pipeline, Producer, Production};
