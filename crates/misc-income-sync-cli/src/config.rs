use anyhow::{Context, Result, bail};
use misc_income_sync::import::ImportOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_LOCATIONS: [&str; 2] = ["misc-income-sync.toml", ".misc-income-sync.toml"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLedger {
    pub file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(try_from = "RawConfigSource")]
pub struct ConfigSource {
    pub files: Vec<PathBuf>,
    pub deposit_to_account: String,
    pub received_from: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfigSource {
    #[serde(default)]
    files: Vec<PathBuf>,
    deposit_to_account: Option<String>,
    received_from: Option<String>,
}

impl TryFrom<RawConfigSource> for ConfigSource {
    type Error = String;

    fn try_from(raw: RawConfigSource) -> Result<Self, Self::Error> {
        let defaults = ImportOptions::default();
        let deposit_to_account = raw
            .deposit_to_account
            .unwrap_or(defaults.deposit_to_account);
        if deposit_to_account.trim().is_empty() {
            return Err("source section cannot have an empty 'deposit_to_account'".to_string());
        }
        let received_from = raw.received_from.unwrap_or(defaults.received_from);
        if received_from.trim().is_empty() {
            return Err("source section cannot have an empty 'received_from'".to_string());
        }

        Ok(ConfigSource {
            files: raw.files,
            deposit_to_account,
            received_from,
        })
    }
}

impl Default for ConfigSource {
    fn default() -> Self {
        let defaults = ImportOptions::default();
        ConfigSource {
            files: Vec::new(),
            deposit_to_account: defaults.deposit_to_account,
            received_from: defaults.received_from,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLog {
    pub file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub ledger: Option<ConfigLedger>,
    #[serde(default)]
    pub source: ConfigSource,
    #[serde(default)]
    pub log: ConfigLog,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<(PathBuf, Self)> {
        let base_dir = path.parent().map(ToOwned::to_owned).unwrap_or_default();

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok((base_dir, config))
    }

    pub fn find_and_load() -> Result<Option<(PathBuf, Self)>> {
        for location in CONFIG_LOCATIONS.map(Path::new) {
            if location.exists() {
                return Self::load_from_file(location).map(Some);
            }
        }

        Ok(None)
    }
}

/// Config file values overridden by command line arguments, with paths resolved.
#[derive(Debug)]
pub struct Settings {
    pub ledger: Option<PathBuf>,
    pub sources: Vec<PathBuf>,
    pub import: ImportOptions,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(
        config: Option<(PathBuf, Config)>,
        ledger: Option<PathBuf>,
        sources: Vec<PathBuf>,
    ) -> Self {
        let (base_dir, config) = config.unwrap_or_default();
        let relative = |path: PathBuf| base_dir.join(path);

        let sources = if sources.is_empty() {
            config.source.files.into_iter().map(relative).collect()
        } else {
            sources
        };
        Settings {
            ledger: ledger.or_else(|| config.ledger.map(|ledger| relative(ledger.file))),
            sources,
            import: ImportOptions {
                deposit_to_account: config.source.deposit_to_account,
                received_from: config.source.received_from,
                ..Default::default()
            },
            log_file: config.log.file.map(relative),
        }
    }

    pub fn ledger(&self) -> Result<&Path> {
        match &self.ledger {
            Some(ledger) => Ok(ledger),
            None => bail!(
                "No ledger given: pass --ledger or set [ledger] file in {}",
                CONFIG_LOCATIONS[0]
            ),
        }
    }

    pub fn sources(&self) -> Result<&[PathBuf]> {
        if self.sources.is_empty() {
            bail!(
                "No source file given: pass --source or set [source] files in {}",
                CONFIG_LOCATIONS[0]
            );
        }
        Ok(&self.sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(source)
    }

    #[test]
    fn full_config() {
        let config = parse(
            r#"
[ledger]
file = "books/ledger.json"

[source]
files = ["credit-nonvendor.xlsx", "/data/extra.csv"]
deposit_to_account = "Savings"

[log]
file = "logs/misc_income_sync.log"
"#,
        )
        .unwrap();

        let settings =
            Settings::resolve(Some((PathBuf::from("/srv/sync"), config)), None, Vec::new());
        assert_eq!(settings.ledger().unwrap(), Path::new("/srv/sync/books/ledger.json"));
        assert_eq!(
            settings.sources().unwrap(),
            [
                PathBuf::from("/srv/sync/credit-nonvendor.xlsx"),
                PathBuf::from("/data/extra.csv")
            ]
        );
        assert_eq!(settings.import.deposit_to_account, "Savings");
        assert_eq!(settings.import.received_from, "Misc Income");
        assert_eq!(
            settings.log_file.as_deref(),
            Some(Path::new("/srv/sync/logs/misc_income_sync.log"))
        );
    }

    #[test]
    fn arguments_override_config() {
        let config = parse(
            r#"
[ledger]
file = "ledger.json"

[source]
files = ["a.csv"]
"#,
        )
        .unwrap();

        let settings = Settings::resolve(
            Some((PathBuf::from("cfg"), config)),
            Some(PathBuf::from("other.json")),
            vec![PathBuf::from("b.csv")],
        );
        assert_eq!(settings.ledger().unwrap(), Path::new("other.json"));
        assert_eq!(settings.sources().unwrap(), [PathBuf::from("b.csv")]);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert!(config.ledger.is_none());
        assert_eq!(config.source.deposit_to_account, "Checking");
        assert_eq!(config.source.received_from, "Misc Income");

        let settings = Settings::resolve(None, None, Vec::new());
        insta::assert_snapshot!(settings.ledger().unwrap_err().to_string(), @"No ledger given: pass --ledger or set [ledger] file in misc-income-sync.toml");
        insta::assert_snapshot!(settings.sources().unwrap_err().to_string(), @"No source file given: pass --source or set [source] files in misc-income-sync.toml");
    }

    #[test]
    fn rejects_bad_config() {
        assert!(parse("[ledger]\nfile = \"a.json\"\nformat = \"json\"\n").is_err());
        assert!(parse("[source]\ndeposit_to_account = \"  \"\n").is_err());
        assert!(parse("[output]\nfiles = []\n").is_err());
    }

    #[test]
    fn load_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misc-income-sync.toml");
        std::fs::write(&path, "[ledger]\nfile = \"ledger.json\"\n").unwrap();

        let (base_dir, config) = Config::load_from_file(&path).unwrap();
        assert_eq!(base_dir, dir.path());
        assert_eq!(config.ledger.unwrap().file, PathBuf::from("ledger.json"));

        let error = Config::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(error.to_string().starts_with("Failed to read config file"));
    }
}
