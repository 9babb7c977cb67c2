// Lyric alignment: pull melismatic stragglers onto the stressed syllable.
//
// When every element of a verticality carries the same syllable, the voices
// are singing one word together, and any element on a weaker metrical
// position is really the same syllable arriving late (or early). Such
// elements are moved to the offset of the strongest element. The moved
// event keeps its end, so it grows or shrinks by the distance moved, and
// the previous event of the same track is resized to keep the track
// gapless. Rests are never moved.
//
// A move is skipped when it cannot be made without breaking a track: the
// first event of a track moving later, a previous event that would shrink
// to nothing, or a moved event that would itself vanish.

use crate::error::Result;
use crate::event::{EPSILON, Event, approx_eq};
use crate::verticality::Windower;
use rustc_hash::FxHashSet;

/// (track, index) of an event inside a set of tracks.
type Slot = (usize, usize);

fn locate(tracks: &[Vec<Event>], event: &Event) -> Option<Slot> {
    tracks.iter().enumerate().find_map(|(t, track)| {
        track
            .iter()
            .position(|e| std::ptr::eq(e, event))
            .map(|i| (t, i))
    })
}

/// Plan every move before touching the tracks.
fn plan_realignments(tracks: &[Vec<Event>]) -> Result<Vec<(Slot, f64)>> {
    let mut seen: FxHashSet<Slot> = FxHashSet::default();
    let mut plan = Vec::new();

    for window in Windower::new(tracks)?.iter() {
        let window = window?;
        let elements: Vec<&Event> = window.elements().collect();
        let Some(lyric) = elements.first().and_then(|e| e.lyric.as_deref()) else {
            continue;
        };
        if !elements.iter().all(|e| e.lyric.as_deref() == Some(lyric)) {
            continue;
        }

        let mut best = elements[0];
        for &element in &elements[1..] {
            if element.metrical_weight > best.metrical_weight {
                best = element;
            }
        }
        for &element in &elements {
            if approx_eq(element.metrical_weight, best.metrical_weight) {
                continue;
            }
            if let Some(slot) = locate(tracks, element) {
                if seen.insert(slot) {
                    plan.push((slot, best.offset));
                }
            }
        }
    }
    Ok(plan)
}

/// Realign lyric-sharing elements in place. Returns the number of events
/// moved.
pub fn align_lyrics(tracks: &mut [Vec<Event>]) -> Result<usize> {
    let plan = plan_realignments(tracks)?;
    let mut moved = 0;

    for ((t, i), new_offset) in plan {
        let track = &mut tracks[t];
        let old_offset = track[i].offset;
        if track[i].is_rest() || approx_eq(old_offset, new_offset) {
            continue;
        }
        if track[i].end() - new_offset <= EPSILON {
            continue;
        }
        if i > 0 {
            let previous = &track[i - 1];
            if new_offset - previous.offset <= EPSILON {
                log::debug!("cannot move event at {} to {}: no room", old_offset, new_offset);
                continue;
            }
            track[i - 1].duration = new_offset - track[i - 1].offset;
        } else if new_offset > old_offset {
            continue;
        }

        let event = &mut track[i];
        event.duration += old_offset - new_offset;
        event.offset = new_offset;
        log::debug!("lyric {:?}: moved {} to {}", event.lyric, old_offset, new_offset);
        moved += 1;
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::check_track;

    /// Upper voice sings "la" on beat two; the lower voice reaches the same
    /// syllable half a beat later.
    fn late_syllable() -> Vec<Vec<Event>> {
        vec![
            vec![
                Event::rest(0.0, 1.0),
                Event::note(1.0, 3.0, 60)
                    .with_lyric("la")
                    .with_metrical_weight(0.25),
            ],
            vec![
                Event::note(0.0, 1.5, 55),
                Event::note(1.5, 2.5, 57)
                    .with_lyric("la")
                    .with_metrical_weight(0.125),
            ],
        ]
    }

    #[test]
    fn test_weaker_element_moves_to_stronger_offset() {
        let mut tracks = late_syllable();
        assert_eq!(align_lyrics(&mut tracks).unwrap(), 1);

        let lower = &tracks[1];
        assert_eq!(lower[0].duration, 1.0);
        assert_eq!(lower[1].offset, 1.0);
        assert_eq!(lower[1].duration, 3.0);
        assert!(check_track(1, lower).is_ok());
        // The stronger element is untouched.
        assert_eq!(tracks[0][1].offset, 1.0);
    }

    #[test]
    fn test_different_syllables_left_alone() {
        let mut tracks = late_syllable();
        tracks[1][1].lyric = Some("lo".to_string());
        let before = tracks.clone();
        assert_eq!(align_lyrics(&mut tracks).unwrap(), 0);
        assert_eq!(tracks, before);
    }

    #[test]
    fn test_rests_are_never_moved() {
        let mut tracks = vec![
            vec![
                Event::note(0.0, 1.0, 60),
                Event::note(1.0, 3.0, 64).with_lyric("a").with_metrical_weight(0.25),
            ],
            vec![
                Event::note(0.0, 1.5, 48),
                Event::rest(1.5, 2.5).with_lyric("a").with_metrical_weight(0.125),
            ],
        ];
        let before = tracks.clone();
        assert_eq!(align_lyrics(&mut tracks).unwrap(), 0);
        assert_eq!(tracks, before);
    }

    #[test]
    fn test_move_that_would_empty_previous_is_skipped() {
        let mut tracks = vec![
            vec![Event::note(0.0, 4.0, 60).with_lyric("o").with_metrical_weight(1.0)],
            vec![
                Event::note(0.0, 0.5, 55).with_lyric("o").with_metrical_weight(1.0),
                Event::note(0.5, 3.5, 57).with_lyric("o").with_metrical_weight(0.125),
            ],
        ];
        let before = tracks.clone();
        assert_eq!(align_lyrics(&mut tracks).unwrap(), 0);
        assert_eq!(tracks, before);
    }
}
