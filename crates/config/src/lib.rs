//! Layered configuration for the binge engine.
//!
//! Values are resolved in order, later layers winning:
//!
//! 1. Built-in defaults.
//! 2. An optional file (`.toml`, `.yaml`/`.yml` or `.json`).
//! 3. `BINGE_`-prefixed environment variables, with `__` separating nested
//!    keys (`BINGE_REMOTE__TIMEOUT_MS=2000`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "BINGE_";
pub const TIMEOUT_RANGE_MS: RangeInclusive<u64> = 1_000..=30_000;
pub const DEBOUNCE_RANGE_MS: RangeInclusive<u64> = 50..=150;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub notify: NotifyConfig,
    pub local: LocalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Upper bound for any single remote read or write.
    pub timeout_ms: u64,
    /// Serve reads from the remote store but never write to it.
    pub read_only: bool,
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self { timeout_ms: 8_000, read_only: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Quiet period before a burst of changes is delivered as one batch.
    pub debounce_ms: u64,
    /// Per-subscriber buffer; slower subscribers skip ahead.
    pub capacity: usize,
}
impl Default for NotifyConfig {
    fn default() -> Self {
        Self { debounce_ms: 100, capacity: 256 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory for the local mirror. Defaults to the platform data dir.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from defaults, `path` (if given) and the
    /// environment, then [`validate()`](Self::validate) it.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Load`] if `path` doesn't exist, has an unknown
    ///   extension, or any layer fails to parse.
    /// - [`ErrorKind::Invalid`] if validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            if !path.is_file() {
                exn::bail!(ErrorKind::Load(format!("{} does not exist", path.display())));
            }
            tracing::debug!(path = %path.display(), "Loading configuration from file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::Load(format!("unsupported format for {}", path.display()))),
            };
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Load("cannot extract configuration".to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that can't be fixed up silently.
    pub fn validate(&self) -> Result<()> {
        if !TIMEOUT_RANGE_MS.contains(&self.remote.timeout_ms) {
            exn::bail!(ErrorKind::Invalid(format!(
                "remote.timeout_ms must be within {}..={}, got {}",
                TIMEOUT_RANGE_MS.start(),
                TIMEOUT_RANGE_MS.end(),
                self.remote.timeout_ms
            )));
        }
        if self.notify.capacity == 0 {
            exn::bail!(ErrorKind::Invalid("notify.capacity must be greater than zero".to_string()));
        }
        if let Some(dir) = &self.local.dir
            && !dir.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid(format!("local.dir must be absolute, got {}", dir.display())));
        }
        Ok(())
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote.timeout_ms)
    }

    /// Debounce window, clamped to a range UI consumers can live with.
    pub fn debounce_window(&self) -> Duration {
        let clamped = self.notify.debounce_ms.clamp(*DEBOUNCE_RANGE_MS.start(), *DEBOUNCE_RANGE_MS.end());
        if clamped != self.notify.debounce_ms {
            tracing::debug!(requested = self.notify.debounce_ms, clamped, "Clamped debounce window");
        }
        Duration::from_millis(clamped)
    }

    /// Directory for the local mirror: `local.dir`, or the platform's data
    /// directory for binge.
    pub fn local_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.local.dir {
            return Ok(dir.clone());
        }
        let dirs = ProjectDirs::from("", "", "binge").ok_or_raise(|| ErrorKind::NoDataDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn load(path: Option<&str>) -> std::result::Result<Config, String> {
        Config::load(path.map(Path::new)).map_err(|e| format!("{e:?}"))
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = load(None)?;
            assert_eq!(config, Config::default());
            assert_eq!(config.remote_timeout(), Duration::from_secs(8));
            assert_eq!(config.debounce_window(), Duration::from_millis(100));
            assert_eq!(config.notify.capacity, 256);
            assert!(!config.remote.read_only);
            Ok(())
        });
    }

    #[rstest]
    #[case("binge.toml", "[remote]\ntimeout_ms = 2000\nread_only = true\n")]
    #[case("binge.yaml", "remote:\n  timeout_ms: 2000\n  read_only: true\n")]
    #[case("binge.json", r#"{"remote": {"timeout_ms": 2000, "read_only": true}}"#)]
    fn test_file_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = load(Some(name))?;
            assert_eq!(config.remote.timeout_ms, 2000);
            assert!(config.remote.read_only);
            assert_eq!(config.notify, NotifyConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("binge.toml", "[notify]\ndebounce_ms = 120\ncapacity = 8\n")?;
            jail.set_env("BINGE_NOTIFY__DEBOUNCE_MS", "60");
            let config = load(Some("binge.toml"))?;
            assert_eq!(config.notify.debounce_ms, 60);
            assert_eq!(config.notify.capacity, 8);
            Ok(())
        });
    }

    #[rstest]
    #[case(10, 50)]
    #[case(100, 100)]
    #[case(1_000, 150)]
    fn test_debounce_is_clamped(#[case] requested: u64, #[case] expected: u64) {
        let config = Config {
            notify: NotifyConfig { debounce_ms: requested, ..NotifyConfig::default() },
            ..Config::default()
        };
        assert_eq!(config.debounce_window(), Duration::from_millis(expected));
    }

    #[rstest]
    #[case("BINGE_REMOTE__TIMEOUT_MS", "10")]
    #[case("BINGE_REMOTE__TIMEOUT_MS", "60000")]
    #[case("BINGE_NOTIFY__CAPACITY", "0")]
    #[case("BINGE_LOCAL__DIR", "relative/dir")]
    fn test_invalid_values_rejected(#[case] key: &str, #[case] value: &str) {
        Jail::expect_with(|jail| {
            jail.set_env(key, value);
            let err = Config::load(None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }

    #[rstest]
    #[case("missing.toml")]
    #[case("binge.ini")]
    fn test_unloadable_file(#[case] name: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("binge.ini", "timeout = 1")?;
            let err = Config::load(Some(Path::new(name))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load(_)));
            Ok(())
        });
    }

    #[test]
    fn test_local_dir_prefers_configured() {
        let dir = std::env::temp_dir().join("binge-config-test");
        let config = Config { local: LocalConfig { dir: Some(dir.clone()) }, ..Config::default() };
        assert_eq!(config.local_dir().unwrap(), dir);
    }
}
