use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use compio::{fs::File, io::AsyncReadExt, io::BufReader};
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::{
    application::data::LogLevel, ext::BestEffortPathExt, reconciler::ConflictPolicy,
};

/// Values read from a YAML settings file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsFile {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<LogLevel>,
    pub on_conflict: Option<ConflictPolicy>,
}

impl SettingsFile {
    /// Reads and parses the settings file at `path`.
    ///
    /// Relative paths inside the file are taken relative to the directory
    /// containing it, not to the working directory.
    pub async fn from_path(path: &Path) -> Result<Self, SettingsFileError> {
        debug!("Opening settings file: {}", path.best_effort_path_display());
        let file = File::open(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;

        let cursor = Cursor::new(file);
        let mut reader = BufReader::new(cursor);
        let res = reader.read_to_string(String::new()).await;
        match res.0 {
            Ok(n) => debug!("Successfully read settings file: {n} bytes"),
            _ => {
                res.0.context(ReadSnafu {
                    file_path: path.best_effort_path_display(),
                })?;
            }
        }

        let settings = SettingsFile::try_from(res.1.as_str())?;
        let base = path.parent().unwrap_or(Path::new(""));
        Ok(settings.relative_to(base))
    }

    fn from_mapping(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Self, SettingsFileError> {
        let mut settings = SettingsFile::default();
        for (key, value) in top_level {
            let Yaml::Value(Scalar::String(key)) = key else {
                debug!("Skipping non-string settings key: {:?}", key);
                continue;
            };
            if matches!(value, Yaml::Value(Scalar::Null)) {
                debug!("Settings key '{key}' is empty, leaving it unset");
                continue;
            }

            match &**key {
                "source" => settings.source = Some(path_value(key, value)?),
                "replica" => settings.replica = Some(path_value(key, value)?),
                "log_file" => settings.log_file = Some(path_value(key, value)?),
                "interval" => settings.interval = Some(seconds_value(key, value)?),
                "log_level" => settings.log_level = Some(choice_value(key, value)?),
                "on_conflict" => settings.on_conflict = Some(choice_value(key, value)?),
                unknown => debug!("Ignoring unknown settings key '{unknown}'"),
            }
        }

        Ok(settings)
    }

    fn relative_to(self, base: &Path) -> Self {
        let anchor = |path: PathBuf| {
            if path.is_relative() {
                base.join(path)
            } else {
                path
            }
        };

        Self {
            source: self.source.map(anchor),
            replica: self.replica.map(anchor),
            log_file: self.log_file.map(anchor),
            ..self
        }
    }
}

impl TryFrom<&str> for SettingsFile {
    type Error = SettingsFileError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let contents_vec = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let contents = contents_vec.first().context(MalformedConfigSnafu)?;
        let top_level = contents.as_mapping().context(TopLevelNotMapSnafu)?;

        Self::from_mapping(top_level)
    }
}

fn path_value(key: &str, value: &Yaml) -> Result<PathBuf, SettingsFileError> {
    match value {
        Yaml::Value(Scalar::String(path)) if !path.is_empty() => Ok(PathBuf::from(&**path)),
        _ => InvalidValueSnafu {
            key,
            expected: "a path",
        }
        .fail(),
    }
}

fn seconds_value(key: &str, value: &Yaml) -> Result<u64, SettingsFileError> {
    let seconds = match value {
        Yaml::Value(Scalar::Integer(seconds)) => u64::try_from(*seconds).ok(),
        _ => None,
    };
    seconds.context(InvalidValueSnafu {
        key,
        expected: "a whole number of seconds",
    })
}

fn choice_value<T: ValueEnum>(key: &str, value: &Yaml) -> Result<T, SettingsFileError> {
    let Yaml::Value(Scalar::String(choice)) = value else {
        return InvalidValueSnafu {
            key,
            expected: possible_values::<T>(),
        }
        .fail();
    };

    T::from_str(choice, true).map_err(|_| SettingsFileError::InvalidValue {
        key: key.to_string(),
        expected: possible_values::<T>(),
    })
}

fn possible_values<T: ValueEnum>() -> String {
    let names = T::value_variants()
        .iter()
        .filter_map(|variant| variant.to_possible_value())
        .map(|value| value.get_name().to_string())
        .collect::<Vec<_>>();
    format!("one of: {}", names.join(", "))
}

#[derive(Debug, Snafu)]
pub enum SettingsFileError {
    #[snafu(display("Failed to read the settings file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the settings file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted settings file"))]
    MalformedConfig,
    #[snafu(display("Top level of the settings file should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Invalid value for '{}', expected {}", key, expected))]
    InvalidValue { key: String, expected: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[compio::test]
    async fn settings_return_error_on_nonexistent_file() {
        let result = SettingsFile::from_path(Path::new("nonexistent.yaml")).await;
        assert!(matches!(result, Err(SettingsFileError::ReadError { .. })));
    }

    #[test]
    fn settings_return_error_on_invalid_yaml() {
        let result = SettingsFile::try_from("invalid: yaml: content: [unclosed");
        assert!(matches!(result, Err(SettingsFileError::ParseError { .. })));
    }

    #[test]
    fn settings_return_error_on_empty_file() {
        let result = SettingsFile::try_from("");
        assert!(matches!(result, Err(SettingsFileError::MalformedConfig)));
    }

    #[rstest]
    #[case::list("- item1\n- item2")]
    #[case::scalar("just a string")]
    fn settings_return_error_when_top_level_is_not_map(#[case] contents: &str) {
        let result = SettingsFile::try_from(contents);
        assert!(matches!(result, Err(SettingsFileError::TopLevelNotMap)));
    }

    #[test]
    fn settings_read_every_known_key() {
        let contents = "\
source: /data/source
replica: /backup/replica
interval: 30
log_file: /var/log/foldersync.log
log_level: debug
on_conflict: skip
";

        let settings = SettingsFile::try_from(contents).expect("Settings should parse");

        assert_eq!(
            settings,
            SettingsFile {
                source: Some(PathBuf::from("/data/source")),
                replica: Some(PathBuf::from("/backup/replica")),
                interval: Some(30),
                log_file: Some(PathBuf::from("/var/log/foldersync.log")),
                log_level: Some(LogLevel::Debug),
                on_conflict: Some(ConflictPolicy::Skip),
            }
        );
    }

    #[test]
    fn settings_ignore_unknown_and_empty_keys() {
        let contents = "source: /data\nlog_file:\ncolour: blue\n";

        let settings = SettingsFile::try_from(contents).expect("Settings should parse");

        assert_eq!(settings.source, Some(PathBuf::from("/data")));
        assert_eq!(settings.log_file, None);
        assert_eq!(settings.replica, None);
    }

    #[test]
    fn settings_choices_are_case_insensitive() {
        let settings = SettingsFile::try_from("log_level: WARN\non_conflict: Replace")
            .expect("Settings should parse");

        assert_eq!(settings.log_level, Some(LogLevel::Warn));
        assert_eq!(settings.on_conflict, Some(ConflictPolicy::Replace));
    }

    #[rstest]
    #[case::negative_interval("interval: -5", "interval")]
    #[case::text_interval("interval: soon", "interval")]
    #[case::unknown_level("log_level: loud", "log_level")]
    #[case::unknown_policy("on_conflict: merge", "on_conflict")]
    #[case::list_as_path("source: [a, b]", "source")]
    fn settings_reject_wrongly_typed_values(#[case] contents: &str, #[case] expected_key: &str) {
        let result = SettingsFile::try_from(contents);

        match result {
            Err(SettingsFileError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("Expected an invalid value error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_choice_lists_possible_values() {
        let error = SettingsFile::try_from("on_conflict: merge").unwrap_err();

        assert!(error.to_string().contains("replace, skip"));
    }

    #[compio::test]
    async fn relative_paths_resolve_against_the_settings_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let settings_path = temp_dir.path().join("foldersync.yaml");
        fs::write(
            &settings_path,
            "source: docs\nreplica: /absolute/replica\nlog_file: logs/sync.log\n",
        )
        .unwrap();

        let settings = SettingsFile::from_path(&settings_path)
            .await
            .expect("Settings should load");

        assert_eq!(settings.source, Some(temp_dir.path().join("docs")));
        assert_eq!(settings.replica, Some(PathBuf::from("/absolute/replica")));
        assert_eq!(settings.log_file, Some(temp_dir.path().join("logs/sync.log")));
    }
}
