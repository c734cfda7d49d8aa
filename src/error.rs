use thiserror::Error;

use crate::mapping::Source;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing field `{field}` at line {line}")]
    MissingField { field: String, line: u64 },

    #[error("field `{field}` at line {line} is not a number: {value:?}")]
    InvalidNumber {
        field: String,
        line: u64,
        value: String,
    },

    #[error("unknown {data_source} station `{station}`")]
    UnknownStation { data_source: Source, station: String },

    #[error("unknown city `{0}`")]
    UnknownCity(String),

    #[error("field `{field}` at line {line} maps to control value {value}, outside 0..=127")]
    ControlOutOfRange {
        field: String,
        line: u64,
        value: i64,
    },

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("MIDI error: {0}")]
    Midi(String),

    #[error("signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("config write error: {0}")]
    ConfigWrite(#[from] ron::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
