// Elven Canopy Harmony Reducer
//
// Reduces polyphonic music to a short sequence of representative chords
// per measure: the harmonic skeleton under the voices. Input is a set of
// gapless tracks of time-stamped events per measure; output is one track of
// chords per measure, at most a configured number of distinct sonorities
// each, weighted by how long, how strong, and how consonant they sound.
//
// Architecture:
// - error.rs: `HarmonyError`, the crate-wide error type
// - temporal.rs: `TemporalKey`, the total order on timeline elements
// - timeline.rs: Key-sorted container with range queries; track sorting
// - event.rs: Events (notes, chords, rests), pitch-class signatures, track checks
// - meter.rs: Time signatures and metrical weight (beat strength)
// - consonance.rs: Consonance predicate trait + tertian default
// - verticality.rs: Windowing simultaneous tracks into verticalities; chordify
// - weighting.rs: Chord weighing policies (duration, metrical, position, consonance)
// - reducer.rs: Greedy per-measure chord reduction with trimming and
//   syncopation smoothing
// - arpeggio.rs: Folding tied arpeggios into block chords
// - lyrics.rs: Aligning lyric-sharing elements onto the strongest beat
// - voicing.rs: Closed-position respelling of output chords
// - config.rs: `ReductionConfig`, loaded from JSON
// - pipeline.rs: Whole-score reduction over measure stacks
//
// Everything is deterministic: the same input and config always produce the
// same reduction.

pub mod arpeggio;
pub mod config;
pub mod consonance;
pub mod error;
pub mod event;
pub mod lyrics;
pub mod meter;
pub mod pipeline;
pub mod reducer;
pub mod temporal;
pub mod timeline;
pub mod verticality;
pub mod voicing;
pub mod weighting;
