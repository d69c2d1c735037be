use crate::game::difficulty::Difficulty;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read song catalog '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed song catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no song with id '{0}' in the catalog")]
    UnknownSong(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongMetadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// MIDI file, relative to the catalog, or an http(s) URL.
    pub filename: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub bpm: Option<f32>,
}

impl SongMetadata {
    /// BPM for display, e.g. "128" rather than "128.0"; "?" when unknown.
    pub fn formatted_bpm(&self) -> String {
        match self.bpm {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => format!("{}", bpm.round() as i32),
            _ => "?".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SongCatalog {
    base_dir: PathBuf,
    songs: Vec<SongMetadata>,
}

impl SongCatalog {
    pub fn from_json(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let songs: Vec<SongMetadata> = serde_json::from_str(json)?;
        Ok(Self {
            base_dir: base_dir.into(),
            songs,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let catalog = Self::from_json(&json, base_dir)?;
        info!("Loaded {} songs from '{}'.", catalog.songs.len(), path.display());
        Ok(catalog)
    }

    pub fn songs(&self) -> &[SongMetadata] {
        &self.songs
    }

    pub fn find(&self, id: &str) -> Result<&SongMetadata, CatalogError> {
        self.songs
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CatalogError::UnknownSong(id.to_string()))
    }

    /// Source string to hand to the MIDI loader for `song`.
    pub fn midi_source(&self, song: &SongMetadata) -> String {
        if song.filename.starts_with("http://") || song.filename.starts_with("https://") {
            song.filename.clone()
        } else {
            self.base_dir.join(&song.filename).to_string_lossy().into_owned()
        }
    }
}
