use std::time::Duration;

use m3u8_rs::Playlist;

/// One entry of the rolling segment list. The path is the only identity a
/// segment has.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRef {
    pub path: String,
    pub duration: f32,
}

impl SegmentRef {
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.duration).unwrap_or_default()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PlaylistError {
    #[error("could not parse playlist: {0}")]
    Parse(String),
    #[error("expected a media playlist, got a master playlist")]
    UnexpectedMaster,
}

pub fn parse_segments(playlist: &[u8]) -> Result<Vec<SegmentRef>, PlaylistError> {
    match m3u8_rs::parse_playlist_res(playlist) {
        Ok(Playlist::MediaPlaylist(pl)) => Ok(pl
            .segments
            .into_iter()
            .map(|s| SegmentRef {
                path: s.uri,
                duration: s.duration,
            })
            .collect()),
        Ok(Playlist::MasterPlaylist(_)) => Err(PlaylistError::UnexpectedMaster),
        Err(e) => Err(PlaylistError::Parse(e.to_string())),
    }
}
