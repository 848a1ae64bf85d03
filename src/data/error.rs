use thiserror::Error;

/// Failures that abort a pipeline run.
///
/// Numeric edge cases (NaN propagation, zero-peak normalisation) are not
/// errors; they are resolved by policy inside the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is missing or no usable rows survived coercion.
    #[error("{input}: {reason}")]
    MalformedInput { input: String, reason: String },

    /// No series with any usable diameter was available to build a grid.
    #[error("no input series with usable diameters to build a common grid")]
    EmptyInput,

    #[error("{input}: {source}")]
    Io {
        input: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{input}: {reason}")]
    Workbook { input: String, reason: String },
}

impl PipelineError {
    pub fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::MalformedInput {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
