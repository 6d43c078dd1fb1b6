//! Decoded sensor data as seen by the window extractor.
//!
//! A [`Volume`] is a dense `f32` grid whose axes are either
//! `(layer, angular, radial)` or `(angular, radial)`. The angular axis is
//! circular (index `angular_len` is index `0` again), the radial axis is a
//! plain bounded range.

use crate::error::{GeometryError, GeometryResult};
use ndarray::{Array2, Array3, ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense sensor grid with a circular angular axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: ArrayD<f32>,
}

impl Volume {
    /// Wraps a dynamically shaped array, rejecting ranks other than 2 or 3.
    pub fn new(data: ArrayD<f32>) -> GeometryResult<Self> {
        match data.ndim() {
            2 | 3 => Ok(Self { data }),
            rank => Err(GeometryError::UnsupportedRank(rank)),
        }
    }

    /// Creates a layered volume with axes `(layer, angular, radial)`.
    pub fn from_layers(data: Array3<f32>) -> Self {
        Self {
            data: data.into_dyn(),
        }
    }

    /// Creates a single-layer volume with axes `(angular, radial)`.
    pub fn from_plane(data: Array2<f32>) -> Self {
        Self {
            data: data.into_dyn(),
        }
    }

    /// Creates a zero-filled volume of the given shape.
    pub fn zeros(shape: &[usize]) -> GeometryResult<Self> {
        Self::new(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn is_layered(&self) -> bool {
        self.data.ndim() == 3
    }

    /// Number of layers, or `None` for a single-layer volume.
    pub fn layer_count(&self) -> Option<usize> {
        self.is_layered().then(|| self.data.shape()[0])
    }

    /// Index of the circular axis within [`Volume::shape`].
    pub fn angular_axis(&self) -> usize {
        if self.is_layered() {
            1
        } else {
            0
        }
    }

    pub fn angular_len(&self) -> usize {
        self.data.shape()[self.angular_axis()]
    }

    pub fn radial_len(&self) -> usize {
        self.data.shape()[self.angular_axis() + 1]
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    pub fn as_array(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn into_array(self) -> ArrayD<f32> {
        self.data
    }
}

/// Products decoded out of a radar file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    Reflectivity,
    StormRelativeVelocity,
    SpectrumWidth,
    CorrelationCoefficient,
    DifferentialReflectivity,
}

impl ChannelId {
    /// Every product, in the order they are stacked into a sample.
    pub const ALL: [ChannelId; 5] = [
        ChannelId::Reflectivity,
        ChannelId::StormRelativeVelocity,
        ChannelId::SpectrumWidth,
        ChannelId::CorrelationCoefficient,
        ChannelId::DifferentialReflectivity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChannelId::Reflectivity => "reflectivity",
            ChannelId::StormRelativeVelocity => "storm_relative_velocity",
            ChannelId::SpectrumWidth => "spectrum_width",
            ChannelId::CorrelationCoefficient => "correlation_coefficient",
            ChannelId::DifferentialReflectivity => "differential_reflectivity",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-sweep bookkeeping reported by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepInfo {
    /// Sweep identifier; `None` when the decoder found no data for the sweep.
    pub id: Option<u32>,
    /// Number of rays actually present in the sweep.
    pub actual_ray_count: usize,
}

impl SweepInfo {
    pub fn present(id: u32, actual_ray_count: usize) -> Self {
        Self {
            id: Some(id),
            actual_ray_count,
        }
    }

    pub fn missing() -> Self {
        Self {
            id: None,
            actual_ray_count: 0,
        }
    }

    pub fn is_present(&self) -> bool {
        self.id.is_some()
    }
}

/// One decoded channel: the data grid plus its sweep metadata.
#[derive(Debug, Clone)]
pub struct ChannelVolume {
    pub channel: ChannelId,
    pub volume: Volume,
    pub sweeps: Vec<SweepInfo>,
}

/// A labelled event located in a volume's own `(angular, radial)` space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub angular_location: f64,
    pub radial_location: f64,
    /// Free-form label carried through from the annotation source.
    #[serde(default)]
    pub label: Option<String>,
}

impl Annotation {
    pub fn at(angular_location: f64, radial_location: f64) -> Self {
        Self {
            angular_location,
            radial_location,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
