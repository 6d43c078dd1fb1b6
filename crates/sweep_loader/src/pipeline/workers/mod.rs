//! Worker management for background production.
//!
//! - `pool`: named worker threads sharing a shutdown flag, joined on drop.
//!
//! The production loop itself lives next to [`Pipeline`](super::Pipeline);
//! batch collation threads use the same pool.

pub(crate) mod pool;
