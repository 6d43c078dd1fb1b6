#![allow(dead_code)]

use sweep_loader::{
    AnnotatedMask, Annotation, AnnotationGenerator, ChannelId, ChannelVolume, DatasetConfig,
    LoadState, SweepInfo, Volume, VolumeDecoder,
};

use anyhow::{anyhow, Result};
use ndarray::{Array2, Array3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const ANGULAR: usize = 72;
pub const RADIAL: usize = 64;
pub const LAYERS: usize = 2;
pub const SECTION: usize = 16;
/// Radial row every fake event sits on.
pub const EVENT_RADIUS: usize = 40;
/// Value written at event cells; the fake annotator labels anything above half of it.
pub const EVENT_VALUE: f32 = 100.0;

/// How a fake file behaves when decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileKind {
    /// Decodes cleanly with this many events on layer 0.
    Good(usize),
    /// `load` itself errors.
    Unreadable,
    /// Loading ends in `LoadState::Failed`.
    LoadFailed,
    /// Spectrum width is never decoded.
    MissingChannel,
    /// Only four sweeps carry data.
    Sparse,
    /// Radial extent too short for a window.
    Narrow(usize),
}

pub struct FakeHandle {
    kind: FileKind,
    polls_left: AtomicUsize,
}

/// In-memory decoder. Every load reports `Loading` for a few polls first.
pub struct FakeDecoder {
    files: HashMap<PathBuf, FileKind>,
    loading_polls: usize,
    pub loads: Arc<AtomicUsize>,
}

impl FakeDecoder {
    pub fn new(files: HashMap<PathBuf, FileKind>) -> Self {
        Self {
            files,
            loading_polls: 2,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_loading_polls(mut self, polls: usize) -> Self {
        self.loading_polls = polls;
        self
    }
}

impl VolumeDecoder for FakeDecoder {
    type Handle = FakeHandle;

    fn load(&self, file: &Path, _channels: &[ChannelId]) -> Result<FakeHandle> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let kind = *self
            .files
            .get(file)
            .ok_or_else(|| anyhow!("no such file: {}", file.display()))?;
        if kind == FileKind::Unreadable {
            return Err(anyhow!("unreadable header"));
        }
        Ok(FakeHandle {
            kind,
            polls_left: AtomicUsize::new(self.loading_polls),
        })
    }

    fn state(&self, handle: &FakeHandle) -> LoadState {
        let left = handle.polls_left.load(Ordering::SeqCst);
        if left > 0 {
            handle.polls_left.store(left - 1, Ordering::SeqCst);
            return LoadState::Loading;
        }
        match handle.kind {
            FileKind::LoadFailed => LoadState::Failed,
            _ => LoadState::Loaded,
        }
    }

    fn is_loaded(&self, handle: &FakeHandle, channel: ChannelId) -> bool {
        !(handle.kind == FileKind::MissingChannel && channel == ChannelId::SpectrumWidth)
    }

    fn channel(&self, handle: &FakeHandle, channel: ChannelId) -> Result<ChannelVolume> {
        let radial = match handle.kind {
            FileKind::Narrow(radial) => radial,
            _ => RADIAL,
        };
        let baseline = channel_value(channel);
        let mut data = Array3::from_elem((LAYERS, ANGULAR, radial), baseline);
        let events = match handle.kind {
            FileKind::Good(events) => events,
            FileKind::Narrow(_) => 1,
            _ => 0,
        };
        for angular in event_rows(events) {
            data[[0, angular, EVENT_RADIUS.min(radial - 1)]] = EVENT_VALUE;
        }

        let present = if handle.kind == FileKind::Sparse { 4 } else { 6 };
        let mut sweeps: Vec<SweepInfo> = (0..present).map(|id| SweepInfo::present(id, 720)).collect();
        sweeps.push(SweepInfo::missing());

        Ok(ChannelVolume {
            channel,
            volume: Volume::from_layers(data),
            sweeps,
        })
    }
}

/// Baseline value a channel is filled with, distinct per channel.
pub fn channel_value(channel: ChannelId) -> f32 {
    ChannelId::ALL
        .iter()
        .position(|c| *c == channel)
        .map_or(0.0, |i| (i + 1) as f32)
}

/// Angular rows that carry an event in a `Good(events)` file.
pub fn event_rows(events: usize) -> Vec<usize> {
    (0..events).map(|i| (10 * i + 5) % ANGULAR).collect()
}

/// Labels every layer-0 cell above half of `EVENT_VALUE`.
pub struct ThresholdAnnotator;

impl AnnotationGenerator for ThresholdAnnotator {
    fn generate(&self, volume: &ChannelVolume) -> Result<AnnotatedMask> {
        let data = volume.volume.as_array();
        let (angular_len, radial_len) = (volume.volume.angular_len(), volume.volume.radial_len());
        let mut mask = Array2::<f32>::zeros((angular_len, radial_len));
        let mut annotations = Vec::new();

        for angular in 0..angular_len {
            for radial in 0..radial_len {
                if data[[0, angular, radial]] > EVENT_VALUE / 2.0 {
                    mask[[angular, radial]] = 1.0;
                    annotations.push(
                        Annotation::at(angular as f64, radial as f64).with_label("rotation"),
                    );
                }
            }
        }

        Ok(AnnotatedMask {
            mask: Volume::from_plane(mask),
            annotations,
        })
    }
}

/// Names one fake file per kind and builds a decoder that knows them.
pub fn fake_files(kinds: &[FileKind]) -> (Vec<PathBuf>, FakeDecoder) {
    let files: Vec<PathBuf> = kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| PathBuf::from(format!("KTLX_{:02}_{:?}", i, kind)))
        .collect();
    let map = files.iter().cloned().zip(kinds.iter().copied()).collect();
    (files, FakeDecoder::new(map))
}

/// Small, deterministic dataset settings.
pub fn test_config(worker_count: usize) -> DatasetConfig {
    DatasetConfig {
        section_size: SECTION,
        jitter: false,
        seed: Some(42),
        worker_count,
        buffer_capacity: 4,
        idle_interval_ms: 10,
        load_poll_interval_ms: 1,
        ..DatasetConfig::default()
    }
}
