pub mod collator;
pub mod cursor;
pub mod dataset;
pub mod error;
pub mod minibatch;
pub mod pipeline;
pub mod sample;
pub mod sampler;
pub mod source;
pub mod split;
pub mod validate;
pub mod volume;
pub mod window;

pub use collator::{Collator, StackCollator};
pub use cursor::FileCursor;
pub use dataset::{DatasetConfig, EventWindowDataset, WindowProducer};
pub use error::{GeometryError, GeometryResult};
pub use minibatch::MiniBatch;
pub use pipeline::{
    BatchConfig, BatchLoader, Pipeline, PipelineBuffer, PipelineConfig, Producer, Production,
    SampleSource,
};
pub use sample::Sample;
pub use sampler::AnnotationSampler;
pub use source::{AnnotatedMask, AnnotationGenerator, LoadState, VolumeDecoder};
pub use split::{FileEntry, TrainTestSplit};
pub use validate::{is_valid, CoverageRule};
pub use volume::{Annotation, ChannelId, ChannelVolume, SweepInfo, Volume};
pub use window::{angular_indices, extract, Window};
