// Multi-part reduction: a whole score down to a one-staff chord summary.
//
// Input is a sequence of `MeasureStack`s, one per bar, each holding the
// bar's tracks (one per voice or part) and its time signature. Each
// measure goes through:
//
// 1. sort every track into timeline order, close tracks that stop early
//    with a rest up to the latest track end, and stamp metrical weights from
//    the time signature (the bar starts at the earliest event);
// 2. lyric alignment, if enabled (lyrics.rs);
// 3. chordify into one gapless track, filling silent stretches with rests;
// 4. arpeggio collapsing, if enabled (arpeggio.rs);
// 5. chord reduction (reducer.rs).
//
// The reduced measure is then finished for output: the last segment is
// stretched to a full bar, chords are respelled in closed position if
// enabled, the previous measure's last chord is tied into this one when
// the two sound exactly the same pitches, and the time signature is
// attached only where it differs from the previous measure's.
//
// Measures with no events at all are skipped. A skipped measure breaks
// tie continuity: nothing is tied across it.

use crate::arpeggio::collapse_arpeggios;
use crate::config::ReductionConfig;
use crate::consonance::TertianConsonance;
use crate::error::Result;
use crate::event::{EPSILON, Event, TieState, describe_pitches};
use crate::lyrics::align_lyrics;
use crate::meter::{TimeSignature, assign_metrical_weights};
use crate::reducer::ChordReducer;
use crate::timeline::sort_events;
use crate::verticality::chordify;
use crate::voicing::closed_position;
use serde::{Deserialize, Serialize};

/// One bar of the input score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasureStack {
    pub number: u32,
    #[serde(default)]
    pub time_signature: TimeSignature,
    pub tracks: Vec<Vec<Event>>,
}

impl MeasureStack {
    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(Vec::is_empty)
    }
}

/// One bar of the reduction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReducedMeasure {
    pub number: u32,
    /// Present only where the meter changes (and on the first measure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<TimeSignature>,
    pub events: Vec<Event>,
}

impl ReducedMeasure {
    /// One line per event: offset, duration, pitches, tie.
    pub fn summary(&self) -> String {
        let mut out = format!("measure {}", self.number);
        if let Some(ts) = &self.time_signature {
            out.push_str(&format!(" ({})", ts));
        }
        for event in &self.events {
            out.push_str(&format!(
                "\n  {:>6.3} +{:<6.3} {}",
                event.offset,
                event.duration,
                describe_pitches(&event.pitches)
            ));
            if event.tie == Some(TieState::Start) {
                out.push_str(" ~");
            }
        }
        out
    }
}

/// Reduce every measure of a score.
pub fn reduce_score(
    stacks: &[MeasureStack],
    config: &ReductionConfig,
) -> Result<Vec<ReducedMeasure>> {
    let reducer = config.reducer()?;
    let mut output: Vec<ReducedMeasure> = Vec::with_capacity(stacks.len());
    let mut last_time_signature: Option<TimeSignature> = None;
    // False right after a skipped measure.
    let mut adjacent = false;

    for stack in stacks {
        if stack.is_empty() {
            log::debug!("measure {} is empty; skipping", stack.number);
            adjacent = false;
            continue;
        }
        let mut events = reduce_measure(stack, config, &reducer)?;
        if config.closed_position {
            for event in events.iter_mut().filter(|e| !e.is_rest()) {
                event.pitches = closed_position(&event.pitches, config.force_octave);
            }
        }

        if adjacent {
            tie_across_barline(output.last_mut(), events.first());
        }
        adjacent = true;

        let time_signature = if last_time_signature != Some(stack.time_signature) {
            last_time_signature = Some(stack.time_signature);
            Some(stack.time_signature)
        } else {
            None
        };
        output.push(ReducedMeasure {
            number: stack.number,
            time_signature,
            events,
        });
    }
    Ok(output)
}

/// Steps 1 to 5 plus padding for one non-empty measure.
fn reduce_measure(
    stack: &MeasureStack,
    config: &ReductionConfig,
    reducer: &ChordReducer,
) -> Result<Vec<Event>> {
    let bar_start = stack
        .tracks
        .iter()
        .filter_map(|track| track.iter().map(|e| e.offset).reduce(f64::min))
        .fold(f64::INFINITY, f64::min);

    let mut tracks: Vec<Vec<Event>> = stack.tracks.iter().cloned().map(sort_events).collect();
    pad_short_tracks(&mut tracks);
    for track in &mut tracks {
        assign_metrical_weights(track, &stack.time_signature, bar_start);
    }
    if config.align_lyrics {
        let moved = align_lyrics(&mut tracks)?;
        if moved > 0 {
            log::debug!("measure {}: realigned {} lyric events", stack.number, moved);
        }
    }

    let mut chords = fill_silence(chordify(&tracks)?);
    if config.collapse_arpeggios {
        chords = collapse_arpeggios(&chords, &TertianConsonance);
    }
    let mut events = reducer.reduce(&chords)?;

    let bar_end = bar_start + stack.time_signature.bar_duration();
    if let Some(last) = events.last_mut() {
        let shortfall = bar_end - last.end();
        if shortfall > EPSILON {
            last.duration += shortfall;
        }
    }
    Ok(events)
}

/// Extend every non-empty track that ends before the others with a rest, so
/// no voice stops while another is still holding.
fn pad_short_tracks(tracks: &mut [Vec<Event>]) {
    let latest_end = tracks
        .iter()
        .filter_map(|track| track.last())
        .map(Event::end)
        .fold(f64::NEG_INFINITY, f64::max);
    for track in tracks.iter_mut() {
        let Some(end) = track.last().map(Event::end) else {
            continue;
        };
        if latest_end - end > EPSILON {
            track.push(Event::rest(end, latest_end - end));
        }
    }
}

/// Insert rests where no track sounds, so the chord track is gapless.
fn fill_silence(chords: Vec<Event>) -> Vec<Event> {
    let mut filled: Vec<Event> = Vec::with_capacity(chords.len());
    for chord in chords {
        if let Some(previous) = filled.last() {
            let gap = chord.offset - previous.end();
            if gap > EPSILON {
                let rest = Event::rest(previous.end(), gap);
                filled.push(rest);
            }
        }
        filled.push(chord);
    }
    filled
}

/// Tie the previous measure's last chord into `first` when both sound the
/// same pitches.
fn tie_across_barline(previous: Option<&mut ReducedMeasure>, first: Option<&Event>) {
    let (Some(previous), Some(first)) = (previous, first) else {
        return;
    };
    let Some(last) = previous.events.last_mut() else {
        return;
    };
    if !last.is_rest() && last.pitches == first.pitches {
        last.tie = Some(TieState::Start);
    }
}
