//! src/dataset/producer.rs
//!
//! One production step of the event window dataset: take the next file from
//! the shared cursor, decode it, check its coverage, label it and cut one
//! window per event.
//!
//! Everything that can go wrong with a single file (load failure, missing
//! channel, sparse coverage, labeller error) skips that file with a warning.
//! Only fatal geometry errors escape, which stops the pipeline.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::path::Path;
use std::thread;
use std::time::Duration;

use super::config::DatasetConfig;
use crate::cursor::FileCursor;
use crate::error::GeometryError;
use crate::pipeline::{with_worker_rng, PipelineBuffer, Producer, Production};
use crate::sample::Sample;
use crate::sampler::AnnotationSampler;
use crate::source::{AnnotationGenerator, LoadState, VolumeDecoder};
use crate::validate::CoverageRule;
use crate::volume::{ChannelId, ChannelVolume, Volume};

pub struct WindowProducer<D, A> {
    decoder: D,
    annotator: A,
    sampler: AnnotationSampler,
    channels: Vec<ChannelId>,
    validated_channels: Vec<ChannelId>,
    coverage: CoverageRule,
    load_poll_interval: Duration,
}

impl<D: VolumeDecoder, A: AnnotationGenerator> WindowProducer<D, A> {
    pub fn new(decoder: D, annotator: A, config: &DatasetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            decoder,
            annotator,
            sampler: AnnotationSampler::new(config.section_size)?.with_jitter(config.jitter),
            channels: config.channels.clone(),
            validated_channels: config.validated_channels.clone(),
            coverage: config.coverage,
            load_poll_interval: config.load_poll_interval(),
        })
    }

    /// Decodes `file` and cuts its windows. `Ok(None)` means the pipeline
    /// stopped while the file was still loading.
    fn windows_for(
        &self,
        file: &Path,
        buffer: &PipelineBuffer<Sample, FileCursor>,
    ) -> Result<Option<Vec<Sample>>> {
        let Some(volumes) = self.decode(file, buffer)? else {
            return Ok(None);
        };

        for channel in &self.validated_channels {
            let Some(volume) = volumes.iter().find(|v| v.channel == *channel) else {
                bail!("Channel {} missing from decoded volumes", channel);
            };
            if !self.coverage.is_valid(&volume.sweeps) {
                bail!("Channel {} has insufficient sweep coverage", channel);
            }
        }

        // Channel order is preserved, so the first entry is the first requested channel.
        let labels = self
            .annotator
            .generate(&volumes[0])
            .context("Annotation generator failed")?;

        let arrays: Vec<Volume> = volumes.into_iter().map(|v| v.volume).collect();
        let samples = with_worker_rng(|rng| {
            self.sampler
                .sample(&arrays, &labels.mask, &labels.annotations, file, rng)
        })?;
        Ok(Some(samples))
    }

    /// Loads every requested channel of `file`, then releases the decoder
    /// handle.
    fn decode(
        &self,
        file: &Path,
        buffer: &PipelineBuffer<Sample, FileCursor>,
    ) -> Result<Option<Vec<ChannelVolume>>> {
        let handle = self
            .decoder
            .load(file, &self.channels)
            .context("Decoder failed to start loading")?;

        loop {
            match self.decoder.state(&handle) {
                LoadState::Loaded => break,
                LoadState::Failed => bail!("Decoder reported a failed load"),
                LoadState::Loading => {
                    if !buffer.is_alive() {
                        return Ok(None);
                    }
                    thread::sleep(self.load_poll_interval);
                }
            }
        }

        let mut volumes = Vec::with_capacity(self.channels.len());
        for &channel in &self.channels {
            if !self.decoder.is_loaded(&handle, channel) {
                bail!("Channel {} was not fully decoded", channel);
            }
            let volume = self
                .decoder
                .channel(&handle, channel)
                .with_context(|| format!("Failed to read channel {}", channel))?;
            volumes.push(volume);
        }
        drop(handle);
        Ok(Some(volumes))
    }
}

impl<D: VolumeDecoder, A: AnnotationGenerator> Producer for WindowProducer<D, A> {
    type Item = Sample;
    type State = FileCursor;

    fn produce(&self, buffer: &PipelineBuffer<Sample, FileCursor>) -> Result<Production<Sample>> {
        let file = buffer.with_state(|cursor, buffered| cursor.next_file(buffered));

        match self.windows_for(&file, buffer) {
            Ok(Some(samples)) => {
                debug!("Cut {} windows from {}", samples.len(), file.display());
                Ok(samples.into())
            }
            Ok(None) => Ok(Production::Empty),
            Err(err) => {
                let fatal = err
                    .downcast_ref::<GeometryError>()
                    .is_some_and(GeometryError::is_fatal);
                if fatal {
                    return Err(err.context(format!("Cannot cut windows from {}", file.display())));
                }
                warn!("Skipping {}: {:#}", file.display(), err);
                Ok(Production::Empty)
            }
        }
    }
}
