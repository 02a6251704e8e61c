use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("无效的时间: {0}")]
    InvalidTimestamp(String),
    #[error("无效的时间段: {0}，格式应为 START-END")]
    InvalidTimeRange(String),
}
