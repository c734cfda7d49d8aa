use serde::{Deserialize, Serialize};

use super::weather::Affine;
use super::{clamp_7bit, fold_ticks, round_even};
use crate::error::Result;
use crate::events::{Event, Tick};
use crate::ingest::RawRow;

/// One water-level sample at one tide station.
#[derive(Debug, Clone, PartialEq)]
pub struct TideReading {
    pub station: String,
    pub time: String,
    pub level: f64,
    pub line: u64,
}

impl TideReading {
    pub const STATION: &'static str = "STATION";
    pub const TIME: &'static str = "DATE";
    pub const LEVEL: &'static str = "WATER_LEVEL";

    pub fn from_row(row: &RawRow) -> Result<Self> {
        Ok(Self {
            station: row.text(Self::STATION)?.to_string(),
            time: row.text(Self::TIME)?.to_string(),
            level: row.number(Self::LEVEL)?,
            line: row.line,
        })
    }
}

/// A held note whose controller follows the water level around its mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideMapping {
    pub channel: u8,
    pub pitch: u8,
    pub velocity: u8,
    pub controller: u8,
    /// Deviation from the mean to controller value
    pub level: Affine,
}

impl Default for TideMapping {
    fn default() -> Self {
        Self {
            channel: 1,
            pitch: 60,
            velocity: 64,
            controller: 23,
            level: Affine::new(8.0, 1.0, 64.0),
        }
    }
}

/// Each level minus the mean of all of them.
pub fn deviations(readings: &[TideReading]) -> Vec<f64> {
    if readings.is_empty() {
        return Vec::new();
    }
    let mean = readings.iter().map(|r| r.level).sum::<f64>() / readings.len() as f64;
    readings.iter().map(|r| r.level - mean).collect()
}

impl TideMapping {
    pub fn level_value(&self, deviation: f64) -> u8 {
        clamp_7bit(round_even(self.level.apply(deviation)))
    }

    pub fn map(&self, deviation: f64, previous: Option<u8>) -> (Tick, u8) {
        let channel = self.channel;
        let pitch = self.pitch;

        let mut events = vec![
            Event::NoteOn {
                channel,
                pitch,
                velocity: self.velocity,
            },
            Event::Control {
                channel,
                controller: self.controller,
                value: self.level_value(deviation),
            },
        ];
        // Only reachable if the pitch ever stops being fixed.
        if let Some(prev) = previous.filter(|&prev| prev != pitch) {
            events.push(Event::NoteOff {
                channel,
                pitch: prev,
                velocity: self.velocity,
            });
        }

        let cleanup = vec![Event::NoteOff {
            channel,
            pitch,
            velocity: self.velocity,
        }];

        (Tick::new(events, cleanup), pitch)
    }

    pub fn build_ticks(&self, readings: &[TideReading]) -> Result<Vec<Tick>> {
        fold_ticks(&deviations(readings), |&deviation, previous| {
            Ok(self.map(deviation, previous))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(level: f64) -> TideReading {
        TideReading {
            station: "9410660".to_string(),
            time: "2023-01-01 00:00".to_string(),
            level,
            line: 2,
        }
    }

    #[test]
    fn deviations_sum_to_zero() {
        let readings: Vec<TideReading> = [1.2, 3.4, -0.7, 2.25, 5.0]
            .iter()
            .map(|&l| reading(l))
            .collect();
        let sum: f64 = deviations(&readings).iter().sum();
        assert!(sum.abs() < 1e-9, "sum = {}", sum);
    }

    #[test]
    fn level_value_is_clamped_both_ways() {
        let mapping = TideMapping::default();
        assert_eq!(mapping.level_value(0.0), 64);
        assert_eq!(mapping.level_value(-20.0), 0);
        assert_eq!(mapping.level_value(20.0), 127);
        assert_eq!(mapping.level_value(1.5), 76);
    }

    #[test]
    fn tick_layout() {
        let mapping = TideMapping::default();
        let (tick, pitch) = mapping.map(-1.0, None);
        assert_eq!(pitch, 60);
        assert_eq!(
            tick.events,
            vec![
                Event::NoteOn {
                    channel: 1,
                    pitch: 60,
                    velocity: 64
                },
                Event::Control {
                    channel: 1,
                    controller: 23,
                    value: 56
                },
            ]
        );
        assert_eq!(
            tick.cleanup,
            vec![Event::NoteOff {
                channel: 1,
                pitch: 60,
                velocity: 64
            }]
        );
    }

    #[test]
    fn fixed_pitch_never_releases_inside_events() {
        let mapping = TideMapping::default();
        let readings: Vec<TideReading> = [0.5, 1.0, 4.0].iter().map(|&l| reading(l)).collect();
        let ticks = mapping.build_ticks(&readings).unwrap();
        assert_eq!(ticks.len(), 3);
        assert!(
            ticks
                .iter()
                .all(|tick| !tick.events.iter().any(Event::is_note_off))
        );
    }

    #[test]
    fn cursor_carries_the_held_pitch() {
        let mapping = TideMapping {
            pitch: 62,
            ..TideMapping::default()
        };
        let readings: Vec<TideReading> = [1.0, 2.0].iter().map(|&l| reading(l)).collect();
        let ticks = mapping.build_ticks(&readings).unwrap();
        // second tick sees 62 as the previous pitch, so nothing is released early
        assert_eq!(ticks[1].events.len(), 2);
        assert_eq!(ticks[1].cleanup, ticks[0].cleanup);
    }

    #[test]
    fn no_readings_no_ticks() {
        assert!(TideMapping::default().build_ticks(&[]).unwrap().is_empty());
    }
}
