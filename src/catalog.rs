use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no track with id {0}")]
    UnknownTrack(u32),
    #[error("catalog is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    pub id: u32,
    pub title: String,
    pub artist: String,
    pub url: String,
    #[serde(default)]
    pub duration_display: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
}

impl TrackDescriptor {
    /// Single-track descriptor for a file given on the command line.
    pub fn from_path(path: &Path) -> Self {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled")
            .to_string();
        Self {
            id: 0,
            title,
            artist: String::new(),
            url: path.to_string_lossy().into_owned(),
            duration_display: String::new(),
            cover_url: None,
            genre: None,
            year: None,
        }
    }

    pub fn label(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist, self.title)
        }
    }
}

/// Ordered track list with a cursor; next and previous wrap around.
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<TrackDescriptor>,
    current: usize,
}

impl Playlist {
    pub fn new(tracks: Vec<TrackDescriptor>) -> Result<Self, CatalogError> {
        if tracks.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { tracks, current: 0 })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path)?;
        let tracks: Vec<TrackDescriptor> = serde_json::from_str(&text)?;
        Self::new(tracks)
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }

    pub fn current(&self) -> &TrackDescriptor {
        &self.tracks[self.current]
    }

    pub fn select(&mut self, id: u32) -> Result<&TrackDescriptor, CatalogError> {
        let index = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or(CatalogError::UnknownTrack(id))?;
        self.current = index;
        Ok(&self.tracks[index])
    }

    pub fn next(&mut self) -> &TrackDescriptor {
        self.current = (self.current + 1) % self.tracks.len();
        self.current()
    }

    pub fn previous(&mut self) -> &TrackDescriptor {
        self.current = (self.current + self.tracks.len() - 1) % self.tracks.len();
        self.current()
    }
}
