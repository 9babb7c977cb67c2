// A sorted timeline of elements keyed by `TemporalKey`.
//
// Each insertion stamps the element with a fresh insert index from a
// monotonic counter, so elements at the same offset, priority, and class
// come back in insertion order every time. Elements stored "at end" sort
// after every finite offset.
//
// Range queries use the ZERO_LOW / ZERO_HIGH sentinels moved to the query
// offsets: ZERO_LOW at `start` sits before everything at `start`, and
// ZERO_HIGH at `end` sits after everything at `end`, so a pair of binary
// searches brackets exactly the wanted elements.
//
// The pipeline uses `sort_events` to put each incoming track in a
// reproducible order before windowing.

use crate::event::Event;
use crate::temporal::{TemporalKey, ZERO_HIGH, ZERO_LOW};

/// Class rank shared by notes, chords, and rests. Lower ranks sort earlier
/// at the same offset (a barline at -5 precedes the notes it shares an
/// offset with).
pub const NOTE_SORT_CLASS: i32 = 20;

/// Anything that can be placed on a timeline.
pub trait TimelineElement {
    fn sort_class(&self) -> i32;

    fn priority(&self) -> f64 {
        0.0
    }

    fn is_grace(&self) -> bool {
        false
    }
}

impl TimelineElement for Event {
    fn sort_class(&self) -> i32 {
        NOTE_SORT_CLASS
    }
}

#[derive(Debug, Clone)]
pub struct Timeline<T> {
    entries: Vec<(TemporalKey, T)>,
    /// Monotonic counter for deterministic ordering within an offset.
    next_insert_index: u64,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Timeline {
            entries: Vec::new(),
            next_insert_index: 0,
        }
    }
}

impl<T: TimelineElement> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item` at `offset`. Returns the key it was filed under.
    pub fn insert(&mut self, offset: f64, item: T) -> TemporalKey {
        let key = self.next_key(offset, &item);
        self.place(key, item)
    }

    /// Insert `item` after every element with a finite offset.
    pub fn store_at_end(&mut self, item: T) -> TemporalKey {
        let key = self.next_key(0.0, &item).with_at_end(true);
        self.place(key, item)
    }

    fn next_key(&mut self, offset: f64, item: &T) -> TemporalKey {
        let index = self.next_insert_index;
        self.next_insert_index += 1;
        TemporalKey::new(
            false,
            offset,
            item.priority(),
            item.sort_class(),
            item.is_grace(),
            index,
        )
    }

    fn place(&mut self, key: TemporalKey, item: T) -> TemporalKey {
        let pos = self.entries.partition_point(|(k, _)| *k < key);
        self.entries.insert(pos, (key, item));
        key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TemporalKey, &T)> {
        self.entries.iter().map(|(key, item)| (key, item))
    }

    /// Elements whose offset lies in `start..end`, or `start..=end` when
    /// `include_end` is set. At-end elements are never included.
    pub fn range(&self, start: f64, end: f64, include_end: bool) -> &[(TemporalKey, T)] {
        let low = ZERO_LOW.with_offset(start);
        let high = if include_end {
            ZERO_HIGH.with_offset(end)
        } else {
            ZERO_LOW.with_offset(end)
        };
        let lo = self.entries.partition_point(|(k, _)| *k < low);
        let hi = self.entries.partition_point(|(k, _)| *k < high);
        if hi <= lo {
            return &[];
        }
        &self.entries[lo..hi]
    }

    pub fn into_items(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, item)| item).collect()
    }
}

/// Put a track's events in timeline order. Events sharing an offset keep
/// their relative input order.
pub fn sort_events(events: Vec<Event>) -> Vec<Event> {
    let mut timeline = Timeline::new();
    for event in events {
        let offset = event.offset;
        timeline.insert(offset, event);
    }
    timeline.into_items()
}
