// Verticalities: merging several gapless tracks into time windows.
//
// A verticality is one window of the merged timeline: the events that begin
// exactly at the window's start ("start elements") and the events that began
// earlier and are still sounding ("overlap elements"). The windower walks all
// tracks with one cursor each; every window ends at the next point where any
// track changes what it sounds, and the next window begins there.
//
// Windows are computed on demand by the `Verticalities` iterator, which holds
// no state beyond its cursors. To start over, ask the `Windower` for a fresh
// iterator; there is no way to resume a partially consumed one.
//
// A window with overlap elements but nothing starting in it cannot be
// represented (that happens when one track ends while another keeps sounding
// and no track starts a new event there). The iterator reports it as
// `HarmonyError::EmptyVerticality` and stops. Stretches where no track sounds
// at all are skipped: the next window begins where the next track starts.
//
// `chordify` is the main consumer: it turns every window into a single
// event carrying the union of the sounding pitches, producing the flattened
// one-track view the reducer works on.

use crate::error::{HarmonyError, Result};
use crate::event::{EPSILON, Event, TieState, approx_eq, check_track};

/// One window of simultaneously sounding events.
#[derive(Debug, Clone)]
pub struct Verticality<'a> {
    start_offset: f64,
    end_offset: f64,
    start_elements: Vec<&'a Event>,
    overlap_elements: Vec<&'a Event>,
}

impl<'a> Verticality<'a> {
    /// Build a verticality from its partition. The window starts at the
    /// first start element's offset and ends at the earliest stop among
    /// all elements.
    pub fn new(start_elements: Vec<&'a Event>, overlap_elements: Vec<&'a Event>) -> Result<Self> {
        let start_offset = start_elements
            .first()
            .map(|e| e.offset)
            .ok_or(HarmonyError::EmptyVerticality)?;
        let mut verticality = Verticality {
            start_offset,
            end_offset: start_offset,
            start_elements,
            overlap_elements,
        };
        verticality.end_offset = verticality.earliest_stop_offset();
        Ok(verticality)
    }

    pub fn start_elements(&self) -> &[&'a Event] {
        &self.start_elements
    }

    pub fn overlap_elements(&self) -> &[&'a Event] {
        &self.overlap_elements
    }

    /// Start elements followed by overlap elements.
    pub fn elements(&self) -> impl Iterator<Item = &'a Event> + '_ {
        self.start_elements
            .iter()
            .chain(self.overlap_elements.iter())
            .copied()
    }

    pub fn start_offset(&self) -> f64 {
        self.start_offset
    }

    /// Where the window ends: the next point at which any track changes.
    pub fn end_offset(&self) -> f64 {
        self.end_offset
    }

    pub fn duration(&self) -> f64 {
        self.end_offset - self.start_offset
    }

    /// Offset of the longest-held overlap element, or the start offset.
    pub fn earliest_start_offset(&self) -> f64 {
        self.overlap_elements
            .iter()
            .map(|e| e.offset)
            .fold(self.start_offset, f64::min)
    }

    pub fn earliest_stop_offset(&self) -> f64 {
        self.elements().map(Event::end).fold(f64::INFINITY, f64::min)
    }

    pub fn latest_stop_offset(&self) -> f64 {
        self.elements()
            .map(Event::end)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Validated set of tracks ready for windowing.
#[derive(Debug, Clone, Copy)]
pub struct Windower<'a> {
    tracks: &'a [Vec<Event>],
}

impl<'a> Windower<'a> {
    /// Check every track for gaps, overlaps, and bad durations.
    pub fn new(tracks: &'a [Vec<Event>]) -> Result<Self> {
        for (index, track) in tracks.iter().enumerate() {
            check_track(index, track)?;
        }
        Ok(Windower { tracks })
    }

    /// A fresh pass over the merged timeline.
    pub fn iter(&self) -> Verticalities<'a> {
        let start = self
            .tracks
            .iter()
            .filter_map(|track| track.first())
            .map(|e| e.offset)
            .reduce(f64::min);
        Verticalities {
            tracks: self.tracks,
            cursors: vec![0; self.tracks.len()],
            start,
        }
    }

    /// All windows in time order.
    pub fn verticalities(&self) -> Result<Vec<Verticality<'a>>> {
        self.iter().collect()
    }

    /// Sliding groups of `n` consecutive windows. With fewer than `n`
    /// windows in total, the whole sequence comes back as one group.
    pub fn windows_of_size(&self, n: usize) -> Result<Vec<Vec<Verticality<'a>>>> {
        if n == 0 {
            return Err(HarmonyError::ZeroWindowSize);
        }
        let all = self.verticalities()?;
        if all.len() < n {
            return Ok(vec![all]);
        }
        Ok(all.windows(n).map(|group| group.to_vec()).collect())
    }
}

/// Iterator over the windows of a `Windower`.
#[derive(Debug, Clone)]
pub struct Verticalities<'a> {
    tracks: &'a [Vec<Event>],
    cursors: Vec<usize>,
    /// Start of the next window; None once finished.
    start: Option<f64>,
}

impl<'a> Iterator for Verticalities<'a> {
    type Item = Result<Verticality<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.start?;
            let mut start_elements = Vec::new();
            let mut overlap_elements = Vec::new();
            let mut boundary = f64::INFINITY;

            for (track, &cursor) in self.tracks.iter().zip(&self.cursors) {
                let Some(event) = track.get(cursor) else {
                    continue;
                };
                if event.offset > start + EPSILON {
                    // Track has not begun yet.
                    boundary = boundary.min(event.offset);
                    continue;
                }
                if event.end() <= start + EPSILON {
                    // Track finished.
                    continue;
                }
                if approx_eq(event.offset, start) {
                    start_elements.push(event);
                } else {
                    overlap_elements.push(event);
                }
                boundary = boundary.min(event.end());
            }

            if start_elements.is_empty() && overlap_elements.is_empty() {
                if boundary.is_finite() {
                    log::trace!("silence at {}; skipping to {}", start, boundary);
                    self.start = Some(boundary);
                    continue;
                }
                self.start = None;
                return None;
            }
            if start_elements.is_empty() {
                log::warn!("nothing starts at offset {} while other tracks sound", start);
                self.start = None;
                return Some(Err(HarmonyError::EmptyVerticality));
            }

            for (track, cursor) in self.tracks.iter().zip(self.cursors.iter_mut()) {
                if track
                    .get(*cursor + 1)
                    .is_some_and(|next| approx_eq(next.offset, boundary))
                {
                    *cursor += 1;
                }
            }
            log::trace!(
                "window {}..{}: {} starting, {} held",
                start,
                boundary,
                start_elements.len(),
                overlap_elements.len()
            );
            self.start = Some(boundary);
            return Some(Ok(Verticality {
                start_offset: start,
                end_offset: boundary,
                start_elements,
                overlap_elements,
            }));
        }
    }
}

/// Tie state of the part of `event` that falls inside `start..end`.
fn piece_tie(event: &Event, start: f64, end: f64) -> Option<TieState> {
    let began_before = event.offset < start - EPSILON;
    let ends_after = event.end() > end + EPSILON;
    let tied_in = matches!(event.tie, Some(TieState::Stop | TieState::Continue));
    let tied_out = matches!(event.tie, Some(TieState::Start | TieState::Continue));
    match (began_before, ends_after) {
        (false, false) => event.tie,
        (true, true) => Some(TieState::Continue),
        (false, true) if tied_in => Some(TieState::Continue),
        (false, true) => Some(TieState::Start),
        (true, false) if tied_out => Some(TieState::Continue),
        (true, false) => Some(TieState::Stop),
    }
}

/// Collapse a set of per-note tie states into one: all stops close a tied
/// group, all starts open one, anything else is mid-group.
pub(crate) fn summarize_ties(ties: &[TieState]) -> Option<TieState> {
    if ties.is_empty() {
        None
    } else if ties.iter().all(|t| *t == TieState::Stop) {
        Some(TieState::Stop)
    } else if ties.iter().all(|t| *t == TieState::Start) {
        Some(TieState::Start)
    } else {
        Some(TieState::Continue)
    }
}

fn chordify_window(verticality: &Verticality<'_>) -> Event {
    let start = verticality.start_offset();
    let end = verticality.end_offset();

    let mut pitches: Vec<u8> = verticality
        .elements()
        .flat_map(|e| e.pitches.iter().copied())
        .collect();
    pitches.sort_unstable();
    pitches.dedup();

    let ties: Vec<TieState> = verticality
        .elements()
        .filter(|e| !e.is_rest())
        .filter_map(|e| piece_tie(e, start, end))
        .collect();

    let metrical_weight = verticality
        .start_elements()
        .iter()
        .map(|e| e.metrical_weight)
        .fold(f64::NEG_INFINITY, f64::max);

    let lyric = verticality
        .start_elements()
        .iter()
        .find_map(|e| e.lyric.clone());

    Event {
        offset: start,
        duration: end - start,
        pitches,
        metrical_weight,
        lyric,
        tie: summarize_ties(&ties),
        accidental_display: None,
    }
}

/// Flatten simultaneous tracks into one gapless sequence of chords, one per
/// verticality.
pub fn chordify(tracks: &[Vec<Event>]) -> Result<Vec<Event>> {
    let windower = Windower::new(tracks)?;
    windower
        .iter()
        .map(|window| window.map(|v| chordify_window(&v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Upper voice C4 (2) D4 (1) E4 (1), lower voice G3 (1) A3 (3).
    fn two_voices() -> Vec<Vec<Event>> {
        vec![
            vec![
                Event::note(0.0, 2.0, 60),
                Event::note(2.0, 1.0, 62),
                Event::note(3.0, 1.0, 64),
            ],
            vec![Event::note(0.0, 1.0, 55), Event::note(1.0, 3.0, 57)],
        ]
    }

    fn pitches_of(events: &[&Event]) -> Vec<u8> {
        events.iter().map(|e| e.pitches[0]).collect()
    }

    #[test]
    fn test_windows_partition_start_and_overlap() {
        let tracks = two_voices();
        let windower = Windower::new(&tracks).unwrap();
        let windows = windower.verticalities().unwrap();
        assert_eq!(windows.len(), 4);

        let starts: Vec<f64> = windows.iter().map(|v| v.start_offset()).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0, 3.0]);

        assert_eq!(pitches_of(windows[0].start_elements()), vec![60, 55]);
        assert!(windows[0].overlap_elements().is_empty());

        assert_eq!(pitches_of(windows[1].start_elements()), vec![57]);
        assert_eq!(pitches_of(windows[1].overlap_elements()), vec![60]);

        assert_eq!(pitches_of(windows[3].start_elements()), vec![64]);
        assert_eq!(pitches_of(windows[3].overlap_elements()), vec![57]);
    }

    #[test]
    fn test_window_offsets() {
        let tracks = two_voices();
        let windows = Windower::new(&tracks).unwrap().verticalities().unwrap();
        let second = &windows[1];
        assert_eq!(second.earliest_start_offset(), 0.0);
        assert_eq!(second.earliest_stop_offset(), 2.0);
        assert_eq!(second.latest_stop_offset(), 4.0);
        assert_eq!(second.end_offset(), 2.0);
        assert_eq!(second.duration(), 1.0);
    }

    #[test]
    fn test_windows_cover_timeline_without_gaps() {
        let tracks = two_voices();
        let windows = Windower::new(&tracks).unwrap().verticalities().unwrap();
        assert_eq!(windows[0].start_offset(), 0.0);
        for pair in windows.windows(2) {
            assert!(approx_eq(pair[0].end_offset(), pair[1].start_offset()));
        }
        assert_eq!(windows.last().unwrap().end_offset(), 4.0);

        // Every event appears in exactly the windows it spans.
        for track in &tracks {
            for event in track {
                let count = windows
                    .iter()
                    .filter(|v| v.elements().any(|e| std::ptr::eq(e, event)))
                    .count();
                let spanned = windows
                    .iter()
                    .filter(|v| {
                        v.start_offset() >= event.offset - EPSILON
                            && v.end_offset() <= event.end() + EPSILON
                    })
                    .count();
                assert_eq!(count, spanned);
                assert!(count >= 1);
            }
        }
    }

    #[test]
    fn test_iterator_restarts_from_scratch() {
        let tracks = two_voices();
        let windower = Windower::new(&tracks).unwrap();
        let mut first = windower.iter();
        first.next();
        first.next();
        let fresh: Vec<_> = windower.iter().collect::<Result<_>>().unwrap();
        assert_eq!(fresh.len(), 4);
        assert_eq!(first.count(), 2);
    }

    #[test]
    fn test_single_event_track_never_advances() {
        let tracks = vec![
            vec![Event::note(0.0, 4.0, 48)],
            vec![Event::note(0.0, 2.0, 60), Event::note(2.0, 2.0, 62)],
        ];
        let windows = Windower::new(&tracks).unwrap().verticalities().unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(pitches_of(windows[1].overlap_elements()), vec![48]);
    }

    #[test]
    fn test_late_starting_track() {
        let tracks = vec![
            vec![Event::note(0.0, 4.0, 48)],
            vec![Event::note(1.0, 3.0, 60)],
        ];
        let windows = Windower::new(&tracks).unwrap().verticalities().unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].end_offset(), 1.0);
        assert_eq!(pitches_of(windows[1].start_elements()), vec![60]);
    }

    #[test]
    fn test_silence_between_tracks_is_skipped() {
        let tracks = vec![
            vec![Event::note(0.0, 1.0, 60)],
            vec![Event::note(2.0, 1.0, 62)],
        ];
        let windows = Windower::new(&tracks).unwrap().verticalities().unwrap();
        let starts: Vec<f64> = windows.iter().map(|v| v.start_offset()).collect();
        assert_eq!(starts, vec![0.0, 2.0]);
    }

    #[test]
    fn test_early_ending_track_is_rejected() {
        let tracks = vec![
            vec![Event::note(0.0, 1.0, 60)],
            vec![Event::note(0.0, 2.0, 55)],
        ];
        let result = Windower::new(&tracks).unwrap().verticalities();
        assert!(matches!(result, Err(HarmonyError::EmptyVerticality)));
    }

    #[test]
    fn test_gapped_track_is_rejected() {
        let tracks = vec![vec![Event::note(0.0, 1.0, 60), Event::note(2.0, 1.0, 62)]];
        assert!(matches!(
            Windower::new(&tracks),
            Err(HarmonyError::NotContiguous { .. })
        ));
    }

    #[test]
    fn test_vanishing_event_rejected_before_windowing() {
        let tracks = vec![
            vec![Event::note(0.0, 1e-7, 60), Event::note(1e-7, 2.0, 62)],
            vec![Event::note(0.0, 1.0, 48), Event::note(1.0, 1.0000001, 50)],
        ];
        assert!(matches!(
            chordify(&tracks),
            Err(HarmonyError::InvalidDuration { track: 0, index: 0, .. })
        ));
    }

    #[test]
    fn test_new_requires_start_elements() {
        let held = Event::note(0.0, 2.0, 60);
        assert!(matches!(
            Verticality::new(vec![], vec![&held]),
            Err(HarmonyError::EmptyVerticality)
        ));
        let fresh = Event::note(1.0, 0.5, 64);
        let v = Verticality::new(vec![&fresh], vec![&held]).unwrap();
        assert_eq!(v.start_offset(), 1.0);
        assert_eq!(v.end_offset(), 1.5);
    }

    #[test]
    fn test_windows_of_size() {
        let tracks = two_voices();
        let windower = Windower::new(&tracks).unwrap();

        let pairs = windower.windows_of_size(2).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[1][0].start_offset(), 1.0);
        assert_eq!(pairs[1][1].start_offset(), 2.0);

        let whole = windower.windows_of_size(5).unwrap();
        assert_eq!(whole.len(), 1);
        assert_eq!(whole[0].len(), 4);

        assert!(matches!(
            windower.windows_of_size(0),
            Err(HarmonyError::ZeroWindowSize)
        ));
    }

    #[test]
    fn test_chordify_unions_pitches_and_splits_ties() {
        let chords = chordify(&two_voices()).unwrap();
        assert_eq!(chords.len(), 4);

        assert_eq!(chords[0].pitches, vec![55, 60]);
        assert_eq!(chords[1].pitches, vec![57, 60]);
        assert_eq!(chords[2].pitches, vec![57, 62]);
        assert_eq!(chords[3].pitches, vec![57, 64]);

        let ties: Vec<Option<TieState>> = chords.iter().map(|c| c.tie).collect();
        assert_eq!(
            ties,
            vec![
                Some(TieState::Start),
                Some(TieState::Continue),
                Some(TieState::Continue),
                Some(TieState::Stop),
            ]
        );

        let total: f64 = chords.iter().map(|c| c.duration).sum();
        assert!(approx_eq(total, 4.0));
    }

    #[test]
    fn test_chordify_takes_strongest_start_weight() {
        let tracks = vec![
            vec![Event::note(0.0, 1.0, 60).with_metrical_weight(1.0)],
            vec![Event::note(0.0, 1.0, 64).with_metrical_weight(0.5)],
        ];
        let chords = chordify(&tracks).unwrap();
        assert_eq!(chords.len(), 1);
        assert_eq!(chords[0].metrical_weight, 1.0);
        assert_eq!(chords[0].tie, None);
    }

    #[test]
    fn test_chordify_all_rests() {
        let tracks = vec![vec![Event::rest(0.0, 2.0)], vec![Event::rest(0.0, 2.0)]];
        let chords = chordify(&tracks).unwrap();
        assert_eq!(chords.len(), 1);
        assert!(chords[0].is_rest());
    }
}
