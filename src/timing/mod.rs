mod scheduler;
mod track;

pub use scheduler::{CancelToken, PlayMode, PlaybackReport, Player, PlayerState};
pub use track::{CityTrackSet, Track, TrackLibrary};
