use serde::{Deserialize, Serialize};

use super::{clamp_7bit, fold_ticks, round_even};
use crate::error::{Error, Result};
use crate::events::{Event, Tick};
use crate::ingest::RawRow;
use crate::scale::{Scale, ScaleKind};

/// One day of weather at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub station: String,
    pub date: String,
    /// Average wind speed
    pub wind: f64,
    pub precipitation: f64,
    pub max_temp: f64,
    pub line: u64,
}

impl WeatherReading {
    pub const STATION: &'static str = "STATION";
    pub const DATE: &'static str = "DATE";
    pub const WIND: &'static str = "AWND";
    pub const PRECIPITATION: &'static str = "PRCP";
    pub const MAX_TEMP: &'static str = "TMAX";

    pub fn from_row(row: &RawRow) -> Result<Self> {
        Ok(Self {
            station: row.text(Self::STATION)?.to_string(),
            date: row.text(Self::DATE)?.to_string(),
            wind: row.number(Self::WIND)?,
            precipitation: row.number(Self::PRECIPITATION)?,
            max_temp: row.number(Self::MAX_TEMP)?,
            line: row.line,
        })
    }
}

/// `x * numerator / denominator + offset`, evaluated in that order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub numerator: f64,
    pub denominator: f64,
    pub offset: f64,
}

impl Affine {
    pub const fn new(numerator: f64, denominator: f64, offset: f64) -> Self {
        Self {
            numerator,
            denominator,
            offset,
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        x * self.numerator / self.denominator + self.offset
    }
}

/// Temperature picks the pitch, wind and precipitation drive two controllers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherMapping {
    pub channel: u8,
    pub velocity: u8,
    pub scale: ScaleKind,
    /// Temperature to scale index
    pub temperature: Affine,
    pub wind_controller: u8,
    pub wind: Affine,
    pub precipitation_controller: u8,
    pub precipitation: Affine,
}

impl Default for WeatherMapping {
    fn default() -> Self {
        Self {
            channel: 0,
            velocity: 64,
            scale: ScaleKind::Pentatonic,
            temperature: Affine::new(3.0, 5.0, -8.0),
            wind_controller: 21,
            wind: Affine::new(127.0, 30.0, 0.0),
            precipitation_controller: 22,
            precipitation: Affine::new(50.0, 1.0, 0.0),
        }
    }
}

impl WeatherMapping {
    /// Quantize a temperature into `scale`. Indices past either end of the
    /// table are pinned to the nearest entry.
    pub fn pitch(&self, scale: &Scale, max_temp: f64) -> Result<u8> {
        let index = round_even(self.temperature.apply(max_temp));
        scale
            .clamped(index)
            .ok_or_else(|| Error::Config(format!("scale {:?} has no pitches", self.scale)))
    }

    pub fn wind_value(&self, wind: f64) -> u8 {
        clamp_7bit(round_even(self.wind.apply(wind)))
    }

    /// Capped at 127. There is no floor: a negative result is rejected.
    pub fn precipitation_value(&self, reading: &WeatherReading) -> Result<u8> {
        let value = round_even(self.precipitation.apply(reading.precipitation)).min(127);
        u8::try_from(value).map_err(|_| Error::ControlOutOfRange {
            field: WeatherReading::PRECIPITATION.to_string(),
            line: reading.line,
            value,
        })
    }

    /// Events for one day. The new note starts before the previous one is
    /// released so a repeated pitch never has a gap.
    pub fn map(
        &self,
        scale: &Scale,
        reading: &WeatherReading,
        previous: Option<u8>,
    ) -> Result<(Tick, u8)> {
        let pitch = self.pitch(scale, reading.max_temp)?;
        let channel = self.channel;

        let mut events = vec![
            Event::Control {
                channel,
                controller: self.precipitation_controller,
                value: self.precipitation_value(reading)?,
            },
            Event::NoteOn {
                channel,
                pitch,
                velocity: self.velocity,
            },
        ];
        if let Some(prev) = previous.filter(|&prev| prev != pitch) {
            events.push(Event::NoteOff {
                channel,
                pitch: prev,
                velocity: self.velocity,
            });
        }
        events.push(Event::Control {
            channel,
            controller: self.wind_controller,
            value: self.wind_value(reading.wind),
        });

        let cleanup = vec![Event::NoteOff {
            channel,
            pitch,
            velocity: self.velocity,
        }];

        Ok((Tick::new(events, cleanup), pitch))
    }

    pub fn build_ticks(&self, readings: &[WeatherReading]) -> Result<Vec<Tick>> {
        let scale = self.scale.build();
        fold_ticks(readings, |reading, previous| {
            self.map(&scale, reading, previous)
        })
    }
}
