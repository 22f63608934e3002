use thiserror::Error;

/// Errors the tracking engine can produce.
///
/// The interval variants signal a caller ordering bug (opening an already
/// open interval or closing a closed one); the event layer checks state
/// before calling into the accumulator, so they should never escape it.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("an interval is already open")]
    IntervalAlreadyOpen,

    #[error("no interval is open")]
    IntervalNotOpen,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
