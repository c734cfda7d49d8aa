//! Turns daily weather and tide readings into looping MIDI tracks per city
//! and plays them live.

pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod mapping;
pub mod output;
pub mod scale;
pub mod terminal;
pub mod timing;

pub use config::{Config, StationTable};
pub use error::{Error, Result};
pub use events::{Event, Tick};
pub use mapping::{Source, build_library};
pub use output::{EventSink, LogSink, MemorySink, MidiPortSink};
pub use scale::{Scale, ScaleKind};
pub use timing::{CancelToken, CityTrackSet, PlayMode, PlaybackReport, Player, PlayerState, Track, TrackLibrary};
