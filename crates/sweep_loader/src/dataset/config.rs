//! src/dataset/config.rs
//!
//! Settings for an [`EventWindowDataset`](super::EventWindowDataset).
//!
//! Every field has a default, so a JSON file only needs the fields it
//! changes:
//! ```json
//! { "section_size": 256, "worker_count": 2, "seed": 7 }
//! ```

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::pipeline::PipelineConfig;
use crate::validate::CoverageRule;
use crate::volume::ChannelId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Side length of every window along both axes.
    pub section_size: usize,
    /// Randomly offset windows around their annotation.
    pub jitter: bool,
    /// Reshuffle the file list at construction and on every wraparound.
    pub auto_shuffle: bool,
    /// Base seed for worker RNGs and file shuffling. Random when absent.
    pub seed: Option<u64>,
    pub worker_count: usize,
    pub buffer_capacity: usize,
    pub idle_interval_ms: u64,
    /// How often a worker polls the decoder while a file is loading.
    pub load_poll_interval_ms: u64,
    /// Products requested from the decoder, stacked in this order. The
    /// annotation generator runs on the first one.
    pub channels: Vec<ChannelId>,
    /// Products whose sweep coverage must pass `coverage`.
    pub validated_channels: Vec<ChannelId>,
    pub coverage: CoverageRule,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            section_size: 512,
            jitter: true,
            auto_shuffle: false,
            seed: None,
            worker_count: 4,
            buffer_capacity: 5,
            idle_interval_ms: 50,
            load_poll_interval_ms: 100,
            channels: ChannelId::ALL.to_vec(),
            validated_channels: vec![ChannelId::Reflectivity, ChannelId::StormRelativeVelocity],
            coverage: CoverageRule::default(),
        }
    }
}

impl DatasetConfig {
    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open dataset config {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse dataset config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.section_size > 0,
            "section_size must be a positive integer value, but got section_size={}",
            self.section_size
        );
        ensure!(!self.channels.is_empty(), "At least one channel must be requested");
        for channel in &self.validated_channels {
            ensure!(
                self.channels.contains(channel),
                "Validated channel '{}' is not among the requested channels",
                channel
            );
        }
        ensure!(
            self.load_poll_interval_ms > 0,
            "Load poll interval must be non-zero"
        );
        self.pipeline_config().validate()
    }

    pub fn load_poll_interval(&self) -> Duration {
        Duration::from_millis(self.load_poll_interval_ms)
    }

    /// The pipeline settings carried by this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let builder = PipelineConfig::builder()
            .worker_count(self.worker_count)
            .buffer_capacity(self.buffer_capacity)
            .idle_interval(Duration::from_millis(self.idle_interval_ms));
        match self.seed {
            Some(seed) => builder.seed(seed).build(),
            None => builder.build(),
        }
    }
}
