//! Collaborator interfaces consumed by the dataset.
//!
//! Decoding radar files and labelling events are not part of this crate. A
//! caller plugs in a [`VolumeDecoder`] (file format reader) and an
//! [`AnnotationGenerator`] (event labeller); the dataset only drives them.

use crate::volume::{Annotation, ChannelId, ChannelVolume, Volume};
use anyhow::Result;
use std::path::Path;

/// Progress of an asynchronous file load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed,
}

/// Reads sensor files into per-channel volumes.
///
/// Loading may run in the background: after [`VolumeDecoder::load`] the
/// dataset polls [`VolumeDecoder::state`] until it stops reporting
/// [`LoadState::Loading`]. A handle is dropped as soon as its channels have
/// been copied out, which releases the decoder's buffers.
pub trait VolumeDecoder: Send + Sync + 'static {
    type Handle: Send;

    /// Starts loading `file`, requesting the given channels.
    fn load(&self, file: &Path, channels: &[ChannelId]) -> Result<Self::Handle>;

    fn state(&self, handle: &Self::Handle) -> LoadState;

    /// Whether `channel` was fully decoded.
    fn is_loaded(&self, handle: &Self::Handle, channel: ChannelId) -> bool;

    /// Returns a decoded channel. Fails if the channel was not requested or
    /// could not be decoded.
    fn channel(&self, handle: &Self::Handle, channel: ChannelId) -> Result<ChannelVolume>;
}

/// Label mask plus the point events found in one volume.
#[derive(Debug, Clone)]
pub struct AnnotatedMask {
    /// Label array in the same `(angular, radial)` space as the volume.
    pub mask: Volume,
    pub annotations: Vec<Annotation>,
}

/// Produces event labels for a decoded volume.
pub trait AnnotationGenerator: Send + Sync + 'static {
    fn generate(&self, volume: &ChannelVolume) -> Result<AnnotatedMask>;
}
