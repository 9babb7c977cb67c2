// Error types for the harmony crate.
//
// Failures fall into two groups. Invalid input (a track with a gap or an
// overlap, a non-positive duration, a verticality with nothing starting in
// it) means the caller handed us a malformed timeline. Configuration errors
// (bad trim threshold, zero chords, unreadable config file) are caught when
// the reducer or pipeline is built, before any measure is touched.
//
// A measure with no pitched events is not an error: the reducer replaces it
// with a single full-length rest (see reducer.rs).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HarmonyError {
    /// An event does not start where the previous event in its track ended.
    #[error("track {track}, event {index}: expected offset {expected}, found {found}")]
    NotContiguous {
        track: usize,
        index: usize,
        expected: f64,
        found: f64,
    },

    /// An event with a zero, negative, or non-finite duration.
    #[error("track {track}, event {index}: invalid duration {duration}")]
    InvalidDuration {
        track: usize,
        index: usize,
        duration: f64,
    },

    #[error("a verticality needs at least one start element")]
    EmptyVerticality,

    #[error("trim threshold {0} is outside 0..=1")]
    TrimBelowOutOfRange(f64),

    #[error("chord count must be at least 1")]
    ZeroChords,

    #[error("verticality window size must be at least 1")]
    ZeroWindowSize,

    #[error("invalid time signature {numerator}/{denominator}")]
    InvalidTimeSignature { numerator: u8, denominator: u8 },

    #[error("invalid JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HarmonyError>;
