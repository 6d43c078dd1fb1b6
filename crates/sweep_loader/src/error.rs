use thiserror::Error;

/// Errors raised while cutting windows out of a volume.
///
/// Most of these describe a mismatch between the configured section size and
/// the data actually being decoded. The dataset treats the ones reported by
/// [`GeometryError::is_fatal`] as configuration faults that stop the pipeline;
/// the rest only disqualify the file that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("volume has an empty angular axis")]
    EmptyAngularAxis,

    #[error("volume must have 2 (angular, radial) or 3 (layer, angular, radial) axes, got {0}")]
    UnsupportedRank(usize),

    #[error("angular window {start}..{end} is empty or inverted")]
    EmptyWindow { start: i64, end: i64 },

    #[error("radial window {start}..{end} does not fit a radial extent of {radial_len}")]
    RadialOutOfBounds {
        start: usize,
        end: usize,
        radial_len: usize,
    },

    #[error(
        "section of {section_size} plus a guard of {guard} does not fit a radial extent of {radial_len}"
    )]
    SectionTooLarge {
        section_size: usize,
        guard: usize,
        radial_len: usize,
    },

    #[error("no channel volumes supplied")]
    NoChannels,

    #[error("channel slices cannot be stacked: {0}")]
    ShapeMismatch(String),
}

impl GeometryError {
    /// Whether this error means the configured window can never be honoured,
    /// as opposed to one malformed file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GeometryError::RadialOutOfBounds { .. } | GeometryError::SectionTooLarge { .. }
        )
    }
}

pub type GeometryResult<T> = std::result::Result<T, GeometryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(GeometryError::SectionTooLarge {
            section_size: 512,
            guard: 5,
            radial_len: 300
        }
        .is_fatal());
        assert!(GeometryError::RadialOutOfBounds {
            start: 0,
            end: 10,
            radial_len: 5
        }
        .is_fatal());
        assert!(!GeometryError::ShapeMismatch("x".into()).is_fatal());
        assert!(!GeometryError::EmptyAngularAxis.is_fatal());
    }

    #[test]
    fn test_messages_name_the_bounds() {
        let msg = GeometryError::RadialOutOfBounds {
            start: 3,
            end: 40,
            radial_len: 20,
        }
        .to_string();
        assert!(msg.contains("3..40"));
        assert!(msg.contains("20"));
    }
}
