// Events: the time-stamped notes, chords, and rests the reducer consumes.
//
// An `Event` is what an upstream parser hands us: an offset and duration in
// quarter lengths, the sounding MIDI pitches (empty for a rest), a metrical
// weight, and optional lyric / tie information. A track is a Vec<Event> that
// must be gapless: each event starts exactly where the previous one ended.
// `check_track` enforces that; nothing in this crate repairs a broken track.
//
// `Signature` is the grouping key for harmonic reduction: the sorted,
// duplicate-free set of pitch classes an event sounds. C4-E4-G4-C5 and
// E3-G3-C4 share the signature (0, 4, 7).

use crate::error::{HarmonyError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Tolerance for comparing offsets and durations.
pub const EPSILON: f64 = 1e-6;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// Tie state of a note, as written in the source notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieState {
    Start,
    Continue,
    Stop,
}

fn default_metrical_weight() -> f64 {
    1.0
}

/// A note, chord, or rest positioned on a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Start position in quarter lengths.
    pub offset: f64,
    /// Length in quarter lengths. Always > `EPSILON`.
    pub duration: f64,
    /// Sounding MIDI pitches. Empty means rest.
    #[serde(default)]
    pub pitches: Vec<u8>,
    /// Rhythmic prominence of the offset (1.0 = downbeat). See meter.rs.
    #[serde(default = "default_metrical_weight")]
    pub metrical_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie: Option<TieState>,
    /// Forced accidental display. None leaves the choice to the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accidental_display: Option<bool>,
}

impl Event {
    pub fn rest(offset: f64, duration: f64) -> Self {
        Event::chord(offset, duration, &[])
    }

    pub fn note(offset: f64, duration: f64, pitch: u8) -> Self {
        Event::chord(offset, duration, &[pitch])
    }

    pub fn chord(offset: f64, duration: f64, pitches: &[u8]) -> Self {
        Event {
            offset,
            duration,
            pitches: pitches.to_vec(),
            metrical_weight: default_metrical_weight(),
            lyric: None,
            tie: None,
            accidental_display: None,
        }
    }

    pub fn with_metrical_weight(mut self, weight: f64) -> Self {
        self.metrical_weight = weight;
        self
    }

    pub fn with_lyric(mut self, lyric: &str) -> Self {
        self.lyric = Some(lyric.to_string());
        self
    }

    pub fn with_tie(mut self, tie: TieState) -> Self {
        self.tie = Some(tie);
        self
    }

    /// Offset at which this event stops sounding.
    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }

    pub fn is_rest(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn signature(&self) -> Signature {
        Signature::from_pitches(&self.pitches)
    }
}

/// Canonical pitch-class content of an event: sorted, no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature(SmallVec<[u8; 8]>);

impl Signature {
    pub fn from_pitches(pitches: &[u8]) -> Self {
        let mut pcs: SmallVec<[u8; 8]> = pitches.iter().map(|p| p % 12).collect();
        pcs.sort_unstable();
        pcs.dedup();
        Signature(pcs)
    }

    pub fn pitch_classes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a rest.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Tuple form, e.g. `(0, 4, 7)`.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, pc) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", pc)?;
        }
        write!(f, ")")
    }
}

/// Verify that a track is gapless and every duration is longer than
/// `EPSILON`. Shorter events would be indistinguishable from their own end.
///
/// `track` is only used to label the error.
pub fn check_track(track: usize, events: &[Event]) -> Result<()> {
    for (index, event) in events.iter().enumerate() {
        if !event.duration.is_finite() || event.duration <= EPSILON {
            return Err(HarmonyError::InvalidDuration {
                track,
                index,
                duration: event.duration,
            });
        }
        if index > 0 {
            let expected = events[index - 1].end();
            if !approx_eq(expected, event.offset) {
                return Err(HarmonyError::NotContiguous {
                    track,
                    index,
                    expected,
                    found: event.offset,
                });
            }
        }
    }
    Ok(())
}

const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Compact note name for a MIDI pitch, e.g. 60 -> "C4", 66 -> "F#4".
pub fn pitch_name(pitch: u8) -> String {
    let octave = pitch as i16 / 12 - 1;
    format!("{}{}", PITCH_CLASS_NAMES[(pitch % 12) as usize], octave)
}

/// Space-separated pitch names, or "rest".
pub fn describe_pitches(pitches: &[u8]) -> String {
    if pitches.is_empty() {
        return "rest".to_string();
    }
    pitches
        .iter()
        .map(|&p| pitch_name(p))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_ignores_octave_and_order() {
        let a = Signature::from_pitches(&[60, 64, 67, 72]); // C4 E4 G4 C5
        let b = Signature::from_pitches(&[55, 52, 48]); // G3 E3 C3
        assert_eq!(a, b);
        assert_eq!(a.pitch_classes(), &[0, 4, 7]);
        assert_eq!(a.to_string(), "(0, 4, 7)");
    }

    #[test]
    fn test_rest_signature_is_empty() {
        let rest = Event::rest(0.0, 1.0);
        assert!(rest.is_rest());
        assert!(rest.signature().is_empty());
        assert_eq!(rest.signature().to_string(), "()");
    }

    #[test]
    fn test_check_track_accepts_gapless() {
        let track = vec![
            Event::note(0.0, 1.5, 60),
            Event::note(1.5, 0.5, 62),
            Event::rest(2.0, 2.0),
        ];
        assert!(check_track(0, &track).is_ok());
    }

    #[test]
    fn test_check_track_rejects_gap_and_overlap() {
        let gap = vec![Event::note(0.0, 1.0, 60), Event::note(1.5, 1.0, 62)];
        match check_track(3, &gap) {
            Err(HarmonyError::NotContiguous { track, index, .. }) => {
                assert_eq!(track, 3);
                assert_eq!(index, 1);
            }
            other => panic!("expected NotContiguous, got {:?}", other),
        }

        let overlap = vec![Event::note(0.0, 2.0, 60), Event::note(1.0, 1.0, 62)];
        assert!(matches!(
            check_track(0, &overlap),
            Err(HarmonyError::NotContiguous { .. })
        ));
    }

    #[test]
    fn test_check_track_rejects_zero_duration() {
        let track = vec![Event::note(0.0, 0.0, 60)];
        assert!(matches!(
            check_track(0, &track),
            Err(HarmonyError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_check_track_rejects_sub_tolerance_duration() {
        let track = vec![Event::note(0.0, 1e-7, 60), Event::note(1e-7, 2.0, 62)];
        match check_track(0, &track) {
            Err(HarmonyError::InvalidDuration { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected InvalidDuration, got {:?}", other),
        }
    }

    #[test]
    fn test_pitch_names() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(66), "F#4");
        assert_eq!(pitch_name(0), "C-1");
        assert_eq!(describe_pitches(&[60, 64, 67]), "C4 E4 G4");
        assert_eq!(describe_pitches(&[]), "rest");
    }

    #[test]
    fn test_event_deserializes_with_defaults() {
        let event: Event =
            serde_json::from_str(r#"{"offset": 1.0, "duration": 0.5, "pitches": [62]}"#)
                .unwrap();
        assert_eq!(event.metrical_weight, 1.0);
        assert!(event.lyric.is_none());
        assert!(event.tie.is_none());
        assert_eq!(event.end(), 1.5);
    }
}
