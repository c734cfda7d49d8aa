use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::events::Tick;

/// One data source's ticks for one city, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    name: String,
    ticks: Vec<Tick>,
}

impl Track {
    pub fn new(name: &str, ticks: Vec<Tick>) -> Self {
        Self {
            name: name.to_string(),
            ticks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// The tick played at global `step`, looping over the track.
    pub fn looped(&self, step: u64) -> Option<&Tick> {
        if self.ticks.is_empty() {
            return None;
        }
        let index = (step % self.ticks.len() as u64) as usize;
        self.ticks.get(index)
    }
}

/// Every track of one city. Tracks play side by side, each looping on its own
/// length, so they drift in and out of phase.
#[derive(Debug, Clone, PartialEq)]
pub struct CityTrackSet {
    city: String,
    tracks: Vec<Track>,
}

impl CityTrackSet {
    pub fn new(city: &str) -> Self {
        Self {
            city: city.to_string(),
            tracks: Vec::new(),
        }
    }

    pub fn with_tracks(city: &str, tracks: Vec<Track>) -> Self {
        Self {
            city: city.to_string(),
            tracks,
        }
    }

    pub fn push(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// True when there is nothing to play.
    pub fn is_silent(&self) -> bool {
        self.tracks.iter().all(Track::is_empty)
    }

    /// Merged tick at `step` with every track looping.
    pub fn merged_tick(&self, step: u64) -> Option<Tick> {
        if self.is_silent() {
            return None;
        }
        Some(Tick::merge(
            self.tracks.iter().filter_map(|track| track.looped(step)),
        ))
    }

    /// Merged tick at `step` without looping. Tracks already past their end
    /// sit this step out; `None` once every track is exhausted.
    pub fn merged_tick_finite(&self, step: u64) -> Option<Tick> {
        let index = usize::try_from(step).ok()?;
        let ticks: Vec<&Tick> = self
            .tracks
            .iter()
            .filter_map(|track| track.ticks.get(index))
            .collect();
        if ticks.is_empty() {
            return None;
        }
        Some(Tick::merge(ticks))
    }

    /// Steps until every track is back at its first tick together.
    pub fn cycle_length(&self) -> u64 {
        self.tracks
            .iter()
            .filter(|track| !track.is_empty())
            .map(|track| track.len() as u64)
            .fold(1, lcm)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

/// Track sets for every configured city, fixed once built.
#[derive(Debug, Clone, Default)]
pub struct TrackLibrary {
    cities: BTreeMap<String, CityTrackSet>,
}

impl TrackLibrary {
    pub fn new(sets: impl IntoIterator<Item = CityTrackSet>) -> Self {
        Self {
            cities: sets
                .into_iter()
                .map(|set| (set.city.clone(), set))
                .collect(),
        }
    }

    pub fn city(&self, city: &str) -> Result<&CityTrackSet> {
        self.cities
            .get(city)
            .ok_or_else(|| Error::UnknownCity(city.to_string()))
    }

    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.cities.keys().map(String::as_str)
    }
}
