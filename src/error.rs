use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid week number {0}: must be between 1 and 105")]
    WeekOutOfRange(i64),

    #[error("Invalid policy start year {0}: must be between 2000 and 2100")]
    YearOutOfRange(i64),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
