use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// Public value the legacy key was historically derived from.
pub const DEFAULT_LEGACY_KEY_SEED: &str = "prep-public-anon-key";

/// User-level configuration loaded from `~/.config/prep/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for data directory (encrypted store).
    pub data_dir: Option<PathBuf>,
    /// Public value used to derive the read-only legacy key.
    pub legacy_key_seed: Option<String>,
    /// Sessions kept in local history.
    pub history_limit: Option<usize>,
    /// Events kept in the audit log.
    pub audit_limit: Option<usize>,
}

impl Config {
    /// Configured seed, or the built-in default.
    pub fn legacy_key_seed(&self) -> &str {
        self.legacy_key_seed
            .as_deref()
            .unwrap_or(DEFAULT_LEGACY_KEY_SEED)
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
            .unwrap_or(prep_history::DEFAULT_HISTORY_LIMIT)
    }

    pub fn audit_limit(&self) -> usize {
        self.audit_limit.unwrap_or(prep_history::DEFAULT_AUDIT_LIMIT)
    }
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("prep").join("config.toml"))
}

/// Write the config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_to_path_if_missing(config, &default_path()?)
}

fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from_path(dir.path().join("config.toml")).expect("load");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.history_limit(), 50);
        assert_eq!(cfg.audit_limit(), 100);
        assert_eq!(cfg.legacy_key_seed(), DEFAULT_LEGACY_KEY_SEED);
    }

    #[test]
    fn returns_default_when_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "  \n").expect("write");
        assert_eq!(load_from_path(&path).expect("load"), Config::default());
    }

    #[test]
    fn parses_custom_config() {
        let contents = r#"
            data_dir = "/tmp/prep-data"
            legacy_key_seed = "anon-key-from-old-build"
            history_limit = 20
            audit_limit = 500
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write temp config");

        let cfg = load_from_path(&path).expect("load");
        assert_eq!(
            cfg,
            Config {
                data_dir: Some(PathBuf::from("/tmp/prep-data")),
                legacy_key_seed: Some("anon-key-from-old-build".into()),
                history_limit: Some(20),
                audit_limit: Some(500),
            }
        );
        assert_eq!(cfg.legacy_key_seed(), "anon-key-from-old-build");
        assert_eq!(cfg.history_limit(), 20);
    }

    #[test]
    fn rejects_malformed_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "history_limit = \"lots\"").expect("write");
        assert!(load_from_path(&path).is_err());
    }

    #[test]
    fn write_default_creates_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            data_dir: Some(PathBuf::from("/tmp/prep-data")),
            history_limit: Some(10),
            ..Config::default()
        };

        write_to_path_if_missing(&cfg, &path).expect("write should succeed");
        let other = Config::default();
        let second = write_to_path_if_missing(&other, &path).expect("second write ok");
        assert_eq!(second, path);
        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded, cfg);
    }
}
