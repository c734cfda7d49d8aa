// Pitch lookup tables built from one-octave interval patterns.
//
// A pattern like the major pentatonic [0, 2, 4, 7, 9] is replicated every 12
// semitones across the MIDI pitch domain, so a mapper can turn any integer
// index into a pitch that stays "in key". Index 0 is the lowest pitch.

use serde::{Deserialize, Serialize};

/// Exclusive upper bound of the pitch domain.
pub const PITCH_LIMIT: u8 = 127;

const OCTAVE: u16 = 12;

/// Ascending, de-duplicated table of pitches in `[0, PITCH_LIMIT)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    pitches: Vec<u8>,
}

/// Replicate `pattern` in every octave and keep the pitches that fall inside
/// the pitch domain. Offsets of 12 or more simply land in a later octave.
pub fn extend(pattern: &[u8]) -> Scale {
    let mut pitches: Vec<u8> = Vec::new();
    let octaves = PITCH_LIMIT as u16 / OCTAVE + 1;

    for octave in 0..octaves {
        for &offset in pattern {
            let pitch = octave * OCTAVE + offset as u16;
            if pitch < PITCH_LIMIT as u16 {
                pitches.push(pitch as u8);
            }
        }
    }

    pitches.sort_unstable();
    pitches.dedup();
    Scale { pitches }
}

impl Scale {
    /// Every pitch in the domain.
    pub fn chromatic() -> Self {
        Scale {
            pitches: (0..PITCH_LIMIT).collect(),
        }
    }

    pub fn pentatonic() -> Self {
        ScaleKind::Pentatonic.build()
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.pitches
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.pitches.get(index).copied()
    }

    /// Look up a signed index, pinning it to the first or last entry when it
    /// falls off either end. `None` only for an empty scale.
    pub fn clamped(&self, index: i64) -> Option<u8> {
        let last = self.pitches.len().checked_sub(1)?;
        let index = index.clamp(0, last as i64) as usize;
        Some(self.pitches[index])
    }
}

/// Named interval patterns selectable from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleKind {
    Chromatic,
    /// Major pentatonic: C D E G A
    Pentatonic,
    Major,
    /// Natural minor
    Minor,
    Blues,
    Custom(Vec<u8>),
}

impl ScaleKind {
    pub fn intervals(&self) -> Vec<u8> {
        match self {
            ScaleKind::Chromatic => (0..12).collect(),
            ScaleKind::Pentatonic => vec![0, 2, 4, 7, 9],
            ScaleKind::Major => vec![0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor => vec![0, 2, 3, 5, 7, 8, 10],
            ScaleKind::Blues => vec![0, 3, 5, 6, 7, 10],
            ScaleKind::Custom(pattern) => pattern.clone(),
        }
    }

    pub fn build(&self) -> Scale {
        extend(&self.intervals())
    }
}
