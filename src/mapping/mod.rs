mod tides;
mod weather;

pub use tides::{TideMapping, TideReading, deviations};
pub use weather::{Affine, WeatherMapping, WeatherReading};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::Tick;
use crate::ingest::RawRow;
use crate::timing::{CityTrackSet, Track, TrackLibrary};

/// The data sources a city can have a track for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Source {
    Weather,
    Tides,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Weather, Source::Tides];

    pub fn name(self) -> &'static str {
        match self {
            Source::Weather => "weather",
            Source::Tides => "tides",
        }
    }

    fn station(self, row: &RawRow) -> Result<&str> {
        match self {
            Source::Weather => row.text(WeatherReading::STATION),
            Source::Tides => row.text(TideReading::STATION),
        }
    }

    /// Decode `rows` and turn them into one track, one tick per row.
    pub fn build_track(self, config: &Config, rows: &[&RawRow]) -> Result<Track> {
        let ticks = match self {
            Source::Weather => {
                let readings = rows
                    .iter()
                    .map(|row| WeatherReading::from_row(row))
                    .collect::<Result<Vec<_>>>()?;
                config.weather.build_ticks(&readings)?
            }
            Source::Tides => {
                let readings = rows
                    .iter()
                    .map(|row| TideReading::from_row(row))
                    .collect::<Result<Vec<_>>>()?;
                config.tides.build_ticks(&readings)?
            }
        };
        Ok(Track::new(self.name(), ticks))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Round half to even, the rounding every mapped value goes through.
pub(crate) fn round_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

pub(crate) fn clamp_7bit(value: i64) -> u8 {
    value.clamp(0, 127) as u8
}

/// Thread the previously sounding pitch through `step` for every reading.
pub(crate) fn fold_ticks<R, F>(readings: &[R], mut step: F) -> Result<Vec<Tick>>
where
    F: FnMut(&R, Option<u8>) -> Result<(Tick, u8)>,
{
    let mut previous = None;
    let mut ticks = Vec::with_capacity(readings.len());
    for reading in readings {
        let (tick, pitch) = step(reading, previous)?;
        previous = Some(pitch);
        ticks.push(tick);
    }
    Ok(ticks)
}

/// Group each source's rows by city and build every city's track set.
///
/// Every configured city gets a set, even without any rows. Tracks inside a
/// set follow the order of `inputs`.
pub fn build_library(config: &Config, inputs: &[(Source, Vec<RawRow>)]) -> Result<TrackLibrary> {
    let mut sets: BTreeMap<String, CityTrackSet> = config
        .stations
        .cities()
        .map(|city| (city.to_string(), CityTrackSet::new(city)))
        .collect();

    for (source, rows) in inputs {
        let mut by_city: BTreeMap<&str, Vec<&RawRow>> = BTreeMap::new();
        for row in rows {
            let station = source.station(row)?;
            let city = config.stations.city_for(*source, station)?;
            by_city.entry(city).or_default().push(row);
        }

        for (city, rows) in by_city {
            let track = source.build_track(config, &rows)?;
            info!("{}: built {} track with {} ticks", city, source, track.len());
            sets.get_mut(city)
                .ok_or_else(|| Error::UnknownCity(city.to_string()))?
                .push(track);
        }
    }

    Ok(TrackLibrary::new(sets.into_values()))
}
