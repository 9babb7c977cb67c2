// Temporal sort keys: a total order over positions on a timeline.
//
// Every element placed on a timeline gets a `TemporalKey`. Keys order by
// (at_end, offset, priority, sort_class, grace, insert_index): elements at
// different offsets sort by offset, and elements sharing an offset fall back
// through the remaining fields. The insert index is a monotonic counter
// assigned at insertion time, so two keys built from identical musical
// content still have a strict, reproducible order.
//
// `at_end` marks elements stored "after everything" (e.g. a closing barline).
// Against another key it sorts after every key without the flag; against a
// bare offset it behaves like +infinity (see `compare_offset`).
//
// Floating-point fields are compared with `total_cmp`, and `-0.0` is
// normalised to `0.0` on construction so `Eq` agrees with `Ord`.
//
// Used by timeline.rs for sorted insertion and range queries.

use std::cmp::Ordering;
use std::fmt;

/// A six-field position on a timeline. Immutable; the `with_*` methods
/// return modified copies.
#[derive(Debug, Clone, Copy)]
pub struct TemporalKey {
    at_end: bool,
    offset: f64,
    priority: f64,
    sort_class: i32,
    is_grace: bool,
    insert_index: u64,
}

/// Probe key at offset 0 that sorts before every element at the same offset.
pub const ZERO_LOW: TemporalKey = TemporalKey {
    at_end: false,
    offset: 0.0,
    priority: f64::NEG_INFINITY,
    sort_class: 0,
    is_grace: false,
    insert_index: 0,
};

/// Probe key at offset 0 that sorts after every element at the same offset.
pub const ZERO_HIGH: TemporalKey = TemporalKey {
    at_end: false,
    offset: 0.0,
    priority: f64::INFINITY,
    sort_class: 0,
    is_grace: false,
    insert_index: 0,
};

fn normalize(value: f64) -> f64 {
    // -0.0 + 0.0 == +0.0
    value + 0.0
}

impl TemporalKey {
    pub fn new(
        at_end: bool,
        offset: f64,
        priority: f64,
        sort_class: i32,
        is_grace: bool,
        insert_index: u64,
    ) -> Self {
        TemporalKey {
            at_end,
            offset: normalize(offset),
            priority: normalize(priority),
            sort_class,
            is_grace,
            insert_index,
        }
    }

    /// A plain key at `offset` with every tie-break field at its default.
    pub fn at(offset: f64) -> Self {
        TemporalKey::new(false, offset, 0.0, 0, false, 0)
    }

    pub fn at_end(&self) -> bool {
        self.at_end
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn sort_class(&self) -> i32 {
        self.sort_class
    }

    pub fn is_grace(&self) -> bool {
        self.is_grace
    }

    pub fn insert_index(&self) -> u64 {
        self.insert_index
    }

    pub fn with_at_end(self, at_end: bool) -> Self {
        TemporalKey { at_end, ..self }
    }

    pub fn with_offset(self, offset: f64) -> Self {
        TemporalKey {
            offset: normalize(offset),
            ..self
        }
    }

    pub fn with_priority(self, priority: f64) -> Self {
        TemporalKey {
            priority: normalize(priority),
            ..self
        }
    }

    pub fn with_sort_class(self, sort_class: i32) -> Self {
        TemporalKey { sort_class, ..self }
    }

    pub fn with_grace(self, is_grace: bool) -> Self {
        TemporalKey { is_grace, ..self }
    }

    pub fn with_insert_index(self, insert_index: u64) -> Self {
        TemporalKey {
            insert_index,
            ..self
        }
    }

    /// Compare this key against a bare offset.
    ///
    /// An at-end key is equal to `f64::INFINITY` and greater than anything
    /// else. Otherwise only the key's offset takes part in the comparison.
    pub fn compare_offset(&self, offset: f64) -> Ordering {
        if self.at_end {
            if offset == f64::INFINITY {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        } else {
            self.offset.total_cmp(&normalize(offset))
        }
    }
}

impl PartialEq for TemporalKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TemporalKey {}

impl PartialOrd for TemporalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TemporalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at_end
            .cmp(&other.at_end)
            .then_with(|| self.offset.total_cmp(&other.offset))
            .then_with(|| self.priority.total_cmp(&other.priority))
            .then_with(|| self.sort_class.cmp(&other.sort_class))
            // Grace notes sort before ordinary notes.
            .then_with(|| other.is_grace.cmp(&self.is_grace))
            .then_with(|| self.insert_index.cmp(&other.insert_index))
    }
}

/// Short form: `"4.0 <0.20.323>"`, or `"End <4.7.[Grace].200>"` for at-end
/// keys.
impl fmt::Display for TemporalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.at_end {
            write!(f, "End")?;
        } else {
            write!(f, "{:?}", self.offset)?;
        }
        write!(f, " <{}.{}", format_priority(self.priority), self.sort_class)?;
        if self.is_grace {
            write!(f, ".[Grace]")?;
        }
        write!(f, ".{}>", self.insert_index)
    }
}

fn format_priority(priority: f64) -> String {
    if priority.is_finite() && priority.fract() == 0.0 {
        format!("{}", priority as i64)
    } else {
        format!("{}", priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_dominates_other_fields() {
        let early = TemporalKey::new(false, 1.0, 100.0, 99, false, 500);
        let late = TemporalKey::new(false, 2.0, -100.0, -99, true, 0);
        assert!(early < late);
        assert!(!(late < early));
    }

    #[test]
    fn test_tie_break_chain() {
        let base = TemporalKey::new(false, 4.0, 0.0, 20, false, 10);

        assert!(base.with_priority(-1.0) < base);
        assert!(base.with_sort_class(-5) < base);
        assert!(base.with_grace(true) < base);
        assert!(base.with_insert_index(9) < base);

        // Priority outranks sort class, which outranks grace status.
        assert!(base.with_priority(-1.0).with_sort_class(50) < base);
        assert!(base.with_sort_class(19).with_grace(false) < base.with_grace(true));
    }

    #[test]
    fn test_distinct_insert_index_never_equal() {
        let a = TemporalKey::new(false, 3.0, 0.0, 20, false, 1);
        let b = a.with_insert_index(2);
        assert_ne!(a, b);
        assert_eq!(a, a.with_insert_index(1));
    }

    #[test]
    fn test_at_end_sorts_after_finite_keys() {
        let end = TemporalKey::new(true, 0.0, 0.0, -5, false, 3);
        let note = TemporalKey::new(false, 1_000_000.0, 0.0, 20, false, 4);
        assert!(note < end);
    }

    #[test]
    fn test_compare_offset() {
        let key = TemporalKey::new(false, 4.0, 0.0, 20, false, 7);
        assert_eq!(key.compare_offset(5.0), Ordering::Less);
        assert_eq!(key.compare_offset(3.0), Ordering::Greater);
        assert_eq!(key.compare_offset(4.0), Ordering::Equal);

        let end = key.with_at_end(true);
        assert_eq!(end.compare_offset(999_999.0), Ordering::Greater);
        assert_eq!(end.compare_offset(f64::INFINITY), Ordering::Equal);
    }

    #[test]
    fn test_negative_zero_normalised() {
        let a = TemporalKey::at(-0.0);
        let b = TemporalKey::at(0.0);
        assert_eq!(a, b);
        assert_eq!(a.compare_offset(0.0), Ordering::Equal);
    }

    #[test]
    fn test_sentinels_bracket_same_offset() {
        let note = TemporalKey::new(false, 0.0, 0.0, 20, false, 12);
        let grace = note.with_grace(true).with_priority(-1000.0);
        assert!(ZERO_LOW < grace);
        assert!(note < ZERO_HIGH);

        let low = ZERO_LOW.with_offset(2.0);
        let high = ZERO_HIGH.with_offset(2.0);
        let at_two = note.with_offset(2.0);
        assert!(low < at_two && at_two < high);
        assert!(high < note.with_offset(2.5));
    }

    #[test]
    fn test_modify_leaves_original_untouched() {
        let original = TemporalKey::new(false, 1.0, 0.0, 20, false, 32);
        let moved = original.with_offset(2.0);
        assert_eq!(moved.offset(), 2.0);
        assert_eq!(original.offset(), 1.0);
        assert_eq!(moved.insert_index(), 32);
    }

    #[test]
    fn test_display() {
        let key = TemporalKey::new(false, 1.0, 0.0, 20, false, 323);
        assert_eq!(key.to_string(), "1.0 <0.20.323>");

        let end = TemporalKey::new(true, 1.0, 4.0, 7, true, 200);
        assert_eq!(end.to_string(), "End <4.7.[Grace].200>");

        assert_eq!(ZERO_LOW.to_string(), "0.0 <-inf.0.0>");
    }

    #[test]
    fn test_sort_is_reproducible() {
        let mut keys: Vec<TemporalKey> = (0..6)
            .map(|i| TemporalKey::new(false, (i % 2) as f64, 0.0, 20, false, 5 - i))
            .collect();
        keys.sort();
        let order: Vec<u64> = keys.iter().map(|k| k.insert_index()).collect();
        assert_eq!(order, vec![1, 3, 5, 0, 2, 4]);
    }
}
