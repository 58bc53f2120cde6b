use gridwatch_core::CoreError;

/// Error type for analytics computations.
///
/// Numeric degeneracies (division by zero, NaN, Inf) are never errors; they
/// are resolved by the clamping rules of each function.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No readings to aggregate for {facility_id} on {date}")]
    EmptyInput { facility_id: String, date: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
