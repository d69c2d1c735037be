use crate::game::chart::DEFAULT_LEAD_IN;
use crate::game::difficulty::Difficulty;
use crate::game::gameplay::GameMode;
use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CONFIG_INI_PATH: &str = "midisaber.ini";
const SECTION: &str = "Options";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub difficulty: Difficulty,
    pub game_mode: GameMode,
    pub lead_in_seconds: f32,
    /// Write generated charts to the cache directory.
    pub cachecharts: bool,
    /// Read charts from the cache directory when the source is unchanged.
    pub fastload: bool,
    pub cache_dir: PathBuf,
    pub song_catalog: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            game_mode: GameMode::BothHands,
            lead_in_seconds: DEFAULT_LEAD_IN,
            cachecharts: true,
            fastload: true,
            cache_dir: PathBuf::from("cache/charts"),
            song_catalog: PathBuf::from("songs.json"),
        }
    }
}

static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map_or(default, |v| v != 0)
}

/// Reads a config file, falling back to defaults for every missing or
/// malformed key.
pub fn read_from(path: &Path) -> Config {
    let default = Config::default();
    let mut conf = Ini::new();
    if let Err(e) = conf.load(path) {
        warn!("Failed to load '{}' ({}), using default options.", path.display(), e);
        return default;
    }

    let difficulty = match conf.get(SECTION, "Difficulty") {
        Some(v) => v.parse().unwrap_or_else(|e| {
            warn!("{}", e);
            default.difficulty
        }),
        None => default.difficulty,
    };
    let game_mode = match conf.get(SECTION, "GameMode") {
        Some(v) => v.parse().unwrap_or_else(|e| {
            warn!("{}", e);
            default.game_mode
        }),
        None => default.game_mode,
    };
    let lead_in_seconds = conf
        .get(SECTION, "LeadInSeconds")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default.lead_in_seconds);

    Config {
        difficulty,
        game_mode,
        lead_in_seconds,
        cachecharts: parse_bool(conf.get(SECTION, "CacheCharts"), default.cachecharts),
        fastload: parse_bool(conf.get(SECTION, "FastLoad"), default.fastload),
        cache_dir: conf
            .get(SECTION, "CacheDir")
            .map(PathBuf::from)
            .unwrap_or(default.cache_dir),
        song_catalog: conf
            .get(SECTION, "SongCatalog")
            .map(PathBuf::from)
            .unwrap_or(default.song_catalog),
    }
}

/// Writes `config` as an INI file.
pub fn write_to(path: &Path, config: &Config) -> Result<(), std::io::Error> {
    let mut conf = Ini::new();
    conf.set(SECTION, "Difficulty", Some(config.difficulty.to_string()));
    conf.set(SECTION, "GameMode", Some(config.game_mode.to_string()));
    conf.set(SECTION, "LeadInSeconds", Some(config.lead_in_seconds.to_string()));
    conf.set(SECTION, "CacheCharts", Some((config.cachecharts as u8).to_string()));
    conf.set(SECTION, "FastLoad", Some((config.fastload as u8).to_string()));
    conf.set(SECTION, "CacheDir", Some(config.cache_dir.display().to_string()));
    conf.set(SECTION, "SongCatalog", Some(config.song_catalog.display().to_string()));
    conf.write(path)
}

/// Loads the global config, creating a default file first if none exists.
pub fn load(path: &Path) {
    if !path.exists() {
        info!("Config file not found, creating defaults in '{}'.", path.display());
        if let Err(e) = write_to(path, &Config::default()) {
            warn!("Failed to create default config file: {}", e);
        }
    }
    let loaded = read_from(path);
    info!(
        "Options: difficulty {}, mode {}, lead-in {:.2}s, fastload {}, cachecharts {}",
        loaded.difficulty, loaded.game_mode, loaded.lead_in_seconds, loaded.fastload, loaded.cachecharts
    );
    *CONFIG.lock().unwrap() = loaded;
}

/// Returns a copy of the currently loaded options.
pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_from(&dir.path().join("nope.ini")), Config::default());
    }

    #[test]
    fn values_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midisaber.ini");
        fs::write(
            &path,
            "[Options]\nDifficulty=hard\nGameMode=Left\nLeadInSeconds=3.5\nCacheCharts=0\nFastLoad=0\nCacheDir=/tmp/x\nSongCatalog=lib.json\n",
        )
        .unwrap();
        let config = read_from(&path);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.game_mode, GameMode::LeftOnly);
        assert_eq!(config.lead_in_seconds, 3.5);
        assert!(!config.cachecharts);
        assert!(!config.fastload);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.song_catalog, PathBuf::from("lib.json"));
    }

    #[test]
    fn bad_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midisaber.ini");
        fs::write(&path, "[Options]\nDifficulty=insane\nLeadInSeconds=-1\nFastLoad=yes\n").unwrap();
        let config = read_from(&path);
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert_eq!(config.lead_in_seconds, DEFAULT_LEAD_IN);
        assert!(config.fastload);
    }

    #[test]
    fn written_defaults_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midisaber.ini");
        let config = Config {
            difficulty: Difficulty::Easy,
            game_mode: GameMode::RightOnly,
            ..Config::default()
        };
        write_to(&path, &config).unwrap();
        assert_eq!(read_from(&path), config);
    }
}
