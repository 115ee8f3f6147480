#![forbid(unsafe_code)]

mod activation;
mod error;
mod logging;
mod response;
mod trust;

pub use activation::Activation;
pub use error::Error;
pub use logging::Logging;
pub use response::Response;
pub use trust::Trust;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// File name looked up next to the host executable.
pub const FILE_NAME: &str = "praesidium.toml";

/// Prefix of environment variables that override file values. Sections are
/// separated with a double underscore, e.g. `PRAESIDIUM_TRUST__PEER_EXECUTABLE`.
pub const ENV_PREFIX: &str = "PRAESIDIUM_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub trust: Trust,
    pub activation: Activation,
    pub response: Response,
    pub logging: Logging,
}

impl Config {
    /// Load configuration from a TOML file layered over the defaults, then
    /// apply environment overrides. The file must exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        Self::extract(Self::defaults().merge(Toml::file(path)))
    }

    /// Same as [`Config::load`], but a missing file yields the defaults
    /// (still subject to environment overrides).
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        Self::extract(Self::defaults())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let toml = toml_edit::ser::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn extract(figment: Figment) -> Result<Self, Error> {
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Settings that would silently widen who is trusted.
    fn validate(&self) -> Result<(), Error> {
        if self.trust.peer_executable.is_empty() {
            return Err(Error::Empty("trust.peer_executable"));
        }
        if self.trust.peer_path_flag.is_empty() {
            return Err(Error::Empty("trust.peer_path_flag"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    // Every test runs inside a jail: loading reads `PRAESIDIUM_*` variables and
    // jails serialize access to the process environment.

    #[test]
    fn roundtrip() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join(FILE_NAME);

            let mut config = Config::default();
            config.logging.file = Some(PathBuf::from("C:\\logs\\praesidium.log"));
            config.save(&path).map_err(|err| err.to_string())?;
            let loaded = Config::load(&path).map_err(|err| err.to_string())?;

            assert_eq!(config, loaded);
            Ok(())
        });
    }

    #[test]
    fn saved_file_has_one_table_per_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        Config::default().save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        for table in ["[trust]", "[activation]", "[response]", "[logging]"] {
            assert!(text.contains(table), "{table} missing from:\n{text}");
        }
        assert!(text.contains("peer_path_flag = \"-steampath=\""));
        assert!(!text.contains("file ="));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(FILE_NAME, "[trust]\npeer_executable = \"client.exe\"\n")?;

            let config = Config::load(FILE_NAME).map_err(|err| err.to_string())?;
            assert_eq!(config.trust.peer_executable, "client.exe");
            assert_eq!(config.trust.peer_path_flag, Trust::default().peer_path_flag);
            assert_eq!(config.activation, Activation::default());
            assert_eq!(config.response, Response::default());
            Ok(())
        });
    }

    #[test]
    fn load_requires_existing_file() {
        Jail::expect_with(|_| {
            let err = Config::load("missing.toml").unwrap_err();
            assert!(matches!(err, Error::Io(ref io) if io.kind() == io::ErrorKind::NotFound));
            Ok(())
        });
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        Jail::expect_with(|_| {
            let config = Config::load_or_default("missing.toml").map_err(|err| err.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_an_error() {
        Jail::expect_with(|jail| {
            jail.create_file(FILE_NAME, "[trust\npeer_executable = ")?;
            assert!(matches!(Config::load(FILE_NAME), Err(Error::Extract(_))));
            Ok(())
        });
    }

    #[test]
    fn empty_peer_executable_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("PRAESIDIUM_TRUST__PEER_EXECUTABLE", "");
            assert!(matches!(
                Config::load_or_default("missing.toml"),
                Err(Error::Empty("trust.peer_executable"))
            ));
            Ok(())
        });
    }

    #[test]
    fn empty_peer_path_flag_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(FILE_NAME, "[trust]\npeer_path_flag = \"\"\n")?;
            assert!(matches!(
                Config::load(FILE_NAME),
                Err(Error::Empty("trust.peer_path_flag"))
            ));
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                FILE_NAME,
                "[response]\nserver = \"FromFile\"\n[activation]\ndeveloper_flag = \"-debug\"\n",
            )?;
            jail.set_env("PRAESIDIUM_RESPONSE__SERVER", "FromEnv");

            let config = Config::load(FILE_NAME).map_err(|err| err.to_string())?;
            assert_eq!(config.response.server, "FromEnv");
            assert_eq!(config.activation.developer_flag, "-debug");
            Ok(())
        });
    }
}
