use crate::config::Config;
use crate::game::chart::{self, BackgroundAudioEvent, Chart, ChartOptions};
use crate::game::midi::{self, LoadError};
use bincode::{Decode, Encode};
use log::{info, warn};
use std::fs;
use std::hash::Hasher;
use std::path::PathBuf;
use thiserror::Error;
use twox_hash::XxHash64;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode chart: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode cached chart: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

#[derive(Encode, Decode)]
struct CachedChart {
    source_hash: u64,
    chart: Chart,
    background: Vec<BackgroundAudioEvent>,
}

pub fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

/// Identifies a (source, options) pair; the file content is checked separately.
fn cache_key(source: &str, options: &ChartOptions) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(source.as_bytes());
    hasher.write(options.difficulty.name().as_bytes());
    hasher.write(&options.lead_in.to_bits().to_le_bytes());
    hasher.finish()
}

/// Generated charts stored on disk with bincode, one file per source and
/// option set.
#[derive(Clone, Debug)]
pub struct ChartCache {
    dir: PathBuf,
    fastload: bool,
    write: bool,
}

impl ChartCache {
    pub fn new(dir: impl Into<PathBuf>, fastload: bool, write: bool) -> Self {
        let dir = dir.into();
        if (fastload || write) && !dir.exists() {
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!(
                    "Could not create cache directory '{}': {}. Caching will be disabled.",
                    dir.display(),
                    e
                );
                return Self {
                    dir,
                    fastload: false,
                    write: false,
                };
            }
        }
        Self { dir, fastload, write }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_dir.clone(), config.fastload, config.cachecharts)
    }

    pub fn path_for(&self, source: &str, options: &ChartOptions) -> PathBuf {
        self.dir.join(format!("{:016x}.bin", cache_key(source, options)))
    }

    /// Returns the cached chart when its recorded source hash still matches
    /// `bytes`. A missing or stale entry is `Ok(None)`.
    pub fn lookup(
        &self,
        source: &str,
        bytes: &[u8],
        options: &ChartOptions,
    ) -> Result<Option<(Chart, Vec<BackgroundAudioEvent>)>, CacheError> {
        let path = self.path_for(source, options);
        if !path.exists() {
            return Ok(None);
        }
        let buffer = fs::read(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let (cached, _): (CachedChart, usize) =
            bincode::decode_from_slice(&buffer, bincode::config::standard())?;
        if cached.source_hash != content_hash(bytes) {
            info!("Cache stale for: {}", source);
            return Ok(None);
        }
        Ok(Some((cached.chart, cached.background)))
    }

    pub fn store(
        &self,
        source: &str,
        bytes: &[u8],
        options: &ChartOptions,
        chart: &Chart,
        background: &[BackgroundAudioEvent],
    ) -> Result<(), CacheError> {
        let cached = CachedChart {
            source_hash: content_hash(bytes),
            chart: chart.clone(),
            background: background.to_vec(),
        };
        let encoded = bincode::encode_to_vec(&cached, bincode::config::standard())?;
        let path = self.path_for(source, options);
        fs::write(&path, encoded).map_err(|source| CacheError::Io { path, source })
    }
}

/// Loads a MIDI source and turns it into a chart, going through `cache`
/// when one is given. Cache problems are logged and never fail the load.
pub fn load_chart(
    source: &str,
    options: ChartOptions,
    cache: Option<&ChartCache>,
) -> Result<(Chart, Vec<BackgroundAudioEvent>), LoadError> {
    let bytes = midi::load_source(source)?;

    if let Some(cache) = cache.filter(|c| c.fastload) {
        match cache.lookup(source, &bytes, &options) {
            Ok(Some(hit)) => {
                info!("Cache hit for: {}", source);
                return Ok(hit);
            }
            Ok(None) => info!("Cache miss for: {}", source),
            Err(e) => warn!("Ignoring unreadable cache entry for {}: {}", source, e),
        }
    } else {
        info!("Parsing (fastload disabled): {}", source);
    }

    let tracks = midi::parse_tracks(&bytes)?;
    let (chart, background) = chart::generate(&tracks, options);

    if let Some(cache) = cache.filter(|c| c.write) {
        if let Err(e) = cache.store(source, &bytes, &options, &chart, &background) {
            warn!("Failed to write cache file for {}: {}", source, e);
        }
    }

    Ok((chart, background))
}
