use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("pitch {0} is outside the 88-key range 21..=108")]
    InvalidPitch(u8),

    #[error("malformed calibration: {0}")]
    MalformedCalibration(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("frame is {actual:?} but the keyboard was mapped for {expected:?}")]
    FrameSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("frame timestamp {current:.3}s is not after the previous frame at {previous:.3}s")]
    NonMonotonicTimestamp { previous: f64, current: f64 },
}
