// Consonance: is a sonority harmonically stable?
//
// The consonance-boosted weigher and the arpeggio collapser both need a
// yes/no judgement on a pitch-class set. That judgement is a music-theory
// question this crate does not try to settle once and for all, so it sits
// behind the `Consonance` trait. `TertianConsonance` is the default:
//
// - a single pitch class (or a rest) is stable;
// - a dyad is stable when its interval class is a third, sixth, fourth, or
//   fifth (pitch classes cannot tell a fourth from a fifth);
// - three pitch classes are stable when they stack in thirds (any triad);
// - four pitch classes are stable when they stack in thirds (any seventh);
// - everything else is unstable.

use crate::event::Signature;

pub trait Consonance {
    fn is_consonant(&self, signature: &Signature) -> bool;
}

impl<F: Fn(&Signature) -> bool> Consonance for F {
    fn is_consonant(&self, signature: &Signature) -> bool {
        self(signature)
    }
}

/// Triads, sevenths, and consonant dyads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TertianConsonance;

impl Consonance for TertianConsonance {
    fn is_consonant(&self, signature: &Signature) -> bool {
        match signature.len() {
            0 | 1 => true,
            2 => {
                let pcs = signature.pitch_classes();
                is_consonant_interval_class(interval_class(pcs[0], pcs[1]))
            }
            3 => is_triad(signature),
            4 => is_seventh(signature),
            _ => false,
        }
    }
}

/// Interval class (0-6) between two pitch classes.
pub fn interval_class(pc_a: u8, pc_b: u8) -> u8 {
    let diff = (pc_b as i16 - pc_a as i16).rem_euclid(12) as u8;
    if diff > 6 { 12 - diff } else { diff }
}

/// m3/M6, M3/m6, P4/P5.
pub fn is_consonant_interval_class(ic: u8) -> bool {
    matches!(ic, 3 | 4 | 5)
}

/// Three pitch classes stacked in thirds (major, minor, diminished, or
/// augmented), in any inversion.
pub fn is_triad(signature: &Signature) -> bool {
    signature.len() == 3 && stacks_in_thirds(signature.pitch_classes())
}

/// Four pitch classes stacked in thirds, in any inversion.
pub fn is_seventh(signature: &Signature) -> bool {
    signature.len() == 4 && stacks_in_thirds(signature.pitch_classes())
}

/// True if some rotation of the sorted pitch classes climbs by minor or
/// major thirds only.
fn stacks_in_thirds(pcs: &[u8]) -> bool {
    let n = pcs.len();
    (0..n).any(|root| {
        (0..n - 1).all(|step| {
            let low = pcs[(root + step) % n];
            let high = pcs[(root + step + 1) % n];
            let up = (high as i16 - low as i16).rem_euclid(12);
            up == 3 || up == 4
        })
    })
}
