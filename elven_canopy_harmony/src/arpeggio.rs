// Arpeggio collapsing: fold broken chords back into block chords.
//
// A chordified arpeggio looks like a run of short chords bound by ties:
// C (tie start), C-E (continue), C-E-G (stop). Left alone, the reducer sees
// three different signatures, and the two partial ones steal weight from
// the real harmony. This pass walks a chordified measure and, for every
// tied group closed by a `Stop`, replaces the group with one chord holding
// the union of its pitches, provided that union is consonant. A dissonant
// union means the tied notes were something other than an arpeggio
// (suspensions, pedal tones), so the group's events pass through unchanged.
//
// An untied event flushes any pending group unchanged. A group still open
// when the measure ends is judged on its own union like any other.

use crate::consonance::Consonance;
use crate::event::{Event, Signature, TieState};

/// Collapse tied arpeggio groups in one chordified measure.
pub fn collapse_arpeggios<C: Consonance>(events: &[Event], consonance: &C) -> Vec<Event> {
    let mut output = Vec::with_capacity(events.len());
    let mut group: Vec<&Event> = Vec::new();

    for event in events {
        match event.tie {
            None => {
                output.extend(group.drain(..).cloned());
                output.push(event.clone());
            }
            Some(TieState::Stop) => {
                group.push(event);
                flush_group(&mut group, consonance, &mut output);
            }
            Some(TieState::Start | TieState::Continue) => group.push(event),
        }
    }
    if !group.is_empty() {
        flush_group(&mut group, consonance, &mut output);
    }
    output
}

fn flush_group<C: Consonance>(group: &mut Vec<&Event>, consonance: &C, output: &mut Vec<Event>) {
    let Some(first) = group.first() else {
        return;
    };
    let mut pitches: Vec<u8> = group.iter().flat_map(|e| e.pitches.iter().copied()).collect();
    pitches.sort_unstable();
    pitches.dedup();

    if consonance.is_consonant(&Signature::from_pitches(&pitches)) {
        log::trace!("collapsing {} tied chords at {}", group.len(), first.offset);
        output.push(Event {
            offset: first.offset,
            duration: group.iter().map(|e| e.duration).sum(),
            pitches,
            metrical_weight: first.metrical_weight,
            lyric: group.iter().find_map(|e| e.lyric.clone()),
            tie: None,
            accidental_display: None,
        });
    } else {
        output.extend(group.iter().map(|e| (*e).clone()));
    }
    group.clear();
}
