use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::mapping::{Source, TideMapping, WeatherMapping};

/// Which station feeds each source of each city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationTable {
    cities: BTreeMap<String, BTreeMap<Source, String>>,
}

impl StationTable {
    pub fn new() -> Self {
        Self {
            cities: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, city: &str, source: Source, station: &str) {
        self.cities
            .entry(city.to_string())
            .or_default()
            .insert(source, station.to_string());
    }

    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.cities.keys().map(String::as_str)
    }

    pub fn station(&self, city: &str, source: Source) -> Option<&str> {
        self.cities
            .get(city)
            .and_then(|sources| sources.get(&source))
            .map(String::as_str)
    }

    pub fn city_for(&self, source: Source, station: &str) -> Result<&str> {
        self.cities
            .iter()
            .find(|(_, sources)| sources.get(&source).is_some_and(|s| s == station))
            .map(|(city, _)| city.as_str())
            .ok_or_else(|| Error::UnknownStation {
                data_source: source,
                station: station.to_string(),
            })
    }
}

impl Default for StationTable {
    fn default() -> Self {
        let mut table = Self::new();
        table.insert("LAX", Source::Weather, "USW00023174");
        table.insert("LAX", Source::Tides, "9410660");
        table.insert("ANC", Source::Weather, "USW00026451");
        table.insert("ANC", Source::Tides, "9455920");
        table.insert("BOS", Source::Weather, "USW00014739");
        table.insert("BOS", Source::Tides, "8443970");
        table
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiConfig {
    pub client_name: String,
    /// Substring of an existing output port. A virtual port is created when unset.
    #[serde(default)]
    pub port: Option<String>,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: "tidesong".to_string(),
            port: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub tick_interval_ms: u64,
    pub stations: StationTable,
    pub weather: WeatherMapping,
    pub tides: TideMapping,
    #[serde(default)]
    pub midi: MidiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            stations: StationTable::default(),
            weather: WeatherMapping::default(),
            tides: TideMapping::default(),
            midi: MidiConfig::default(),
        }
    }
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be positive".into()));
        }
        if self.weather.scale.build().is_empty() {
            return Err(Error::Config(format!(
                "weather scale {:?} has no pitches",
                self.weather.scale
            )));
        }
        for (name, channel) in [
            ("weather.channel", self.weather.channel),
            ("tides.channel", self.tides.channel),
        ] {
            if channel > 15 {
                return Err(Error::Config(format!("{} {} is above 15", name, channel)));
            }
        }
        for (name, value) in [
            ("weather.velocity", self.weather.velocity),
            ("weather.wind_controller", self.weather.wind_controller),
            (
                "weather.precipitation_controller",
                self.weather.precipitation_controller,
            ),
            ("tides.pitch", self.tides.pitch),
            ("tides.velocity", self.tides.velocity),
            ("tides.controller", self.tides.controller),
        ] {
            if value > 127 {
                return Err(Error::Config(format!("{} {} is above 127", name, value)));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let ron_string = fs::read_to_string(path)?;
        let config: Config = ron::from_str(&ron_string)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaleKind;

    #[test]
    fn default_fixture_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        let cities: Vec<&str> = config.stations.cities().collect();
        assert_eq!(cities, vec!["ANC", "BOS", "LAX"]);
        assert_eq!(
            config.stations.station("BOS", Source::Tides),
            Some("8443970")
        );
    }

    #[test]
    fn station_lookup_is_per_source() {
        let table = StationTable::default();
        assert_eq!(table.city_for(Source::Weather, "USW00026451").unwrap(), "ANC");
        assert_eq!(table.city_for(Source::Tides, "9410660").unwrap(), "LAX");
        assert!(matches!(
            table.city_for(Source::Tides, "USW00026451"),
            Err(Error::UnknownStation { .. })
        ));
    }

    #[test]
    fn round_trips_through_ron_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("tidesong.ron");

        let mut config = Config::default();
        config.weather.scale = ScaleKind::Custom(vec![0, 3, 7]);
        config.midi.port = Some("FluidSynth".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ron");

        let mut config = Config::default();
        config.tides.channel = 16;
        config.save(&path).unwrap();

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn empty_scale_is_invalid() {
        let mut config = Config::default();
        config.weather.scale = ScaleKind::Custom(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.ron");
        fs::write(&path, "Config(tick_interval_ms: \"soon\")").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::ConfigParse(_))));
    }
}
