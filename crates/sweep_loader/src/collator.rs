use crate::minibatch::MiniBatch;
use crate::sample::Sample;
use anyhow::{bail, Context, Result};
use ndarray::{stack, ArrayD, ArrayViewD, Axis};

/// A `Collator` defines how to combine multiple [`Sample`]s into a [`MiniBatch`].
pub trait Collator: Send + Sync {
    fn collate(&self, samples: &[Sample]) -> Result<MiniBatch>;
}

/// A `Collator` that stacks data and mask windows of identical shape along a
/// new leading batch axis (axis 0). Windows cut with the same section size
/// always agree in shape; anything else is reported as an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackCollator;

impl Collator for StackCollator {
    fn collate(&self, samples: &[Sample]) -> Result<MiniBatch> {
        if samples.is_empty() {
            bail!("Cannot collate empty sample list");
        }

        let data = stack_checked(samples.iter().map(|s| s.data.view()).collect(), "data")?;
        let mask = stack_checked(samples.iter().map(|s| s.mask.view()).collect(), "mask")?;

        Ok(MiniBatch {
            data,
            mask,
            sources: samples.iter().map(|s| s.source_file.clone()).collect(),
            bounds: samples.iter().map(|s| s.bounds).collect(),
        })
    }
}

fn stack_checked(views: Vec<ArrayViewD<'_, f32>>, field: &str) -> Result<ArrayD<f32>> {
    let reference_shape = views[0].shape().to_vec();
    for (i, view) in views.iter().enumerate() {
        if view.shape() != reference_shape.as_slice() {
            bail!(
                "Shape mismatch in sample {} for '{}': expected {:?}, got {:?}",
                i,
                field,
                reference_shape,
                view.shape()
            );
        }
    }
    stack(Axis(0), &views).with_context(|| format!("Failed to stack '{}' windows", field))
}
