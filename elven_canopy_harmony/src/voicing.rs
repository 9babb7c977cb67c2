// Voicing: respell a reduced chord in closed position.
//
// Reduced chords inherit the spread of the full score (a bass two octaves
// under the soprano), which reads badly as a one-staff summary. Closed
// position keeps the bass and packs every other pitch into the octave
// directly above it, dropping duplicates. Optionally the bass itself is
// moved into a chosen octave first (octave 4 holds middle C, MIDI 60).

/// Lowest and highest representable MIDI pitch.
const PITCH_RANGE: (i16, i16) = (0, 127);

/// Closed-position spelling of `pitches`, sorted ascending. Pitches that
/// fall outside MIDI range after moving are clamped into it by octaves.
pub fn closed_position(pitches: &[u8], force_octave: Option<i8>) -> Vec<u8> {
    let Some(&lowest) = pitches.iter().min() else {
        return Vec::new();
    };
    let mut bass = lowest as i16;
    if let Some(octave) = force_octave {
        bass = fit_range(bass % 12 + (octave as i16 + 1) * 12);
    }

    let mut voiced: Vec<u8> = pitches
        .iter()
        .map(|&p| {
            let above = (p as i16 - bass).rem_euclid(12);
            fit_range(bass + above) as u8
        })
        .collect();
    voiced.sort_unstable();
    voiced.dedup();
    voiced
}

fn fit_range(mut pitch: i16) -> i16 {
    while pitch < PITCH_RANGE.0 {
        pitch += 12;
    }
    while pitch > PITCH_RANGE.1 {
        pitch -= 12;
    }
    pitch
}
