//! Error types for the choir part exporter

use std::fmt;

/// Custom error type for choir MIDI processing
#[derive(Debug, Clone)]
pub enum ChoirError {
    /// E001: Malformed MIDI input
    MidiParse(String),
    /// E002: MIDI file I/O error
    MidiFileError(String),
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: Invalid configuration parameter
    InvalidConfigParameter(String),
    /// E005: Instrument name not in the General MIDI table
    UnknownInstrument(String),
    /// E006: MIDI channel outside 0..=15
    InvalidChannel(u8),
    /// E007: Program or volume value outside 0..=127
    InvalidValue(String, u8),
    /// E008: Accompaniment melody source part missing from the file
    SourcePartNotFound(String),
    /// E009: All 16 MIDI channels already in use
    NoChannelAvailable,
    /// E010: MIDI serialization/save error
    MidiExportError(String),
    /// E011: External renderer process failure
    Render(String),
}

impl fmt::Display for ChoirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoirError::MidiParse(msg) => {
                write!(f, "E001: Malformed MIDI input - {}", msg)
            }
            ChoirError::MidiFileError(msg) => {
                write!(f, "E002: MIDI file I/O error - {}", msg)
            }
            ChoirError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            ChoirError::InvalidConfigParameter(msg) => {
                write!(f, "E004: Invalid configuration parameter - {}", msg)
            }
            ChoirError::UnknownInstrument(name) => {
                write!(f, "E005: Unknown instrument name '{}'", name)
            }
            ChoirError::InvalidChannel(channel) => {
                write!(f, "E006: MIDI channel {} outside 0..=15", channel)
            }
            ChoirError::InvalidValue(field, value) => {
                write!(f, "E007: {} value {} outside 0..=127", field, value)
            }
            ChoirError::SourcePartNotFound(name) => {
                write!(f, "E008: Melody source part '{}' not found in file", name)
            }
            ChoirError::NoChannelAvailable => {
                write!(f, "E009: All 16 MIDI channels already in use")
            }
            ChoirError::MidiExportError(msg) => {
                write!(f, "E010: MIDI export error - {}", msg)
            }
            ChoirError::Render(msg) => {
                write!(f, "E011: Renderer process failure - {}", msg)
            }
        }
    }
}

impl std::error::Error for ChoirError {}

// From implementations for common error types
impl From<std::io::Error> for ChoirError {
    fn from(err: std::io::Error) -> Self {
        ChoirError::MidiFileError(format!("File I/O error: {}", err))
    }
}

impl From<midly::Error> for ChoirError {
    fn from(err: midly::Error) -> Self {
        ChoirError::MidiParse(err.to_string())
    }
}

impl From<serde_json::Error> for ChoirError {
    fn from(err: serde_json::Error) -> Self {
        ChoirError::ConfigValidationFailed(format!("JSON error: {}", err))
    }
}

/// Result type alias for choir MIDI operations
pub type Result<T> = std::result::Result<T, ChoirError>;
