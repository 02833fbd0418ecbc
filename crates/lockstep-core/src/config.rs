//! Sampler configuration.
//!
//! Values come from three layers: built-in defaults, an optional
//! configuration file, and command-line flags. The binary applies them in
//! that order to a [`SamplerConfig`], which is then handed to the sampler
//! and never changed again.
//!
//! The file format is line oriented:
//!
//! ```text
//! # sample every 500 ms, forward a snapshot to syslog once a minute
//! interval = 500ms
//! syslog_interval = 1m
//! syslog_facility = local3
//! syslog_priority = notice
//! syslog_classes = process,thermal
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collector::DEFAULT_MIN_UID;
use crate::model::SensorClass;
use crate::output::{Category, CategorySet, Decimator, Facility, Priority};
use crate::util::{DurationError, parse_duration};

/// Error type for configuration loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    Read(PathBuf, io::Error),
    /// A line is neither blank, a comment, nor `key = value`.
    Syntax { line: usize, text: String },
    /// A key that is not recognised.
    UnknownKey { line: usize, key: String },
    /// A recognised key with an unusable value.
    InvalidValue {
        line: usize,
        key: String,
        message: String,
    },
    /// Low-rate interval shorter than the base interval.
    LowRateTooShort {
        interval: Duration,
        syslog_interval: Duration,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(path, e) => write!(f, "unable to read {}: {}", path.display(), e),
            ConfigError::Syntax { line, text } => {
                write!(f, "line {}: expected 'key = value', got '{}'", line, text)
            }
            ConfigError::UnknownKey { line, key } => {
                write!(f, "line {}: unknown key '{}'", line, key)
            }
            ConfigError::InvalidValue { line, key, message } => {
                write!(f, "line {}: invalid value for '{}': {}", line, key, message)
            }
            ConfigError::LowRateTooShort {
                interval,
                syslog_interval,
            } => write!(
                f,
                "syslog_interval ({:?}) must not be shorter than interval ({:?})",
                syslog_interval, interval
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Values read from a configuration file. Unset keys are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub interval: Option<Duration>,
    pub syslog_interval: Option<Duration>,
    pub syslog_facility: Option<Facility>,
    pub syslog_priority: Option<Priority>,
    pub syslog_classes: Option<CategorySet>,
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

impl ConfigFile {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&raw)
    }

    /// Parses configuration text. A repeated key keeps its last value.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (idx, line) in raw.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    text: trimmed.to_string(),
                });
            };
            let key = key.trim();
            let value = unquote(value.trim());
            let invalid = |message: String| ConfigError::InvalidValue {
                line: line_no,
                key: key.to_string(),
                message,
            };
            let duration = |value: &str| {
                parse_duration(value).map_err(|e: DurationError| invalid(e.message))
            };

            match key {
                "interval" => config.interval = Some(duration(value)?),
                "syslog_interval" => config.syslog_interval = Some(duration(value)?),
                "syslog_facility" => {
                    config.syslog_facility = Some(value.parse().map_err(invalid)?)
                }
                "syslog_priority" => {
                    config.syslog_priority = Some(value.parse().map_err(invalid)?)
                }
                "syslog_classes" => {
                    let classes = CategorySet::parse_list(value).map_err(invalid)?;
                    if classes.is_empty() {
                        return Err(invalid("empty class list".to_string()));
                    }
                    config.syslog_classes = Some(classes);
                }
                _ => {
                    return Err(ConfigError::UnknownKey {
                        line: line_no,
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(config)
    }
}

/// Settings of the decimated system-log channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LowRateConfig {
    pub period: u64,
    pub facility: Facility,
    pub priority: Priority,
    pub classes: CategorySet,
}

/// Resolved configuration of one sampler run.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Base sampling interval.
    pub interval: Duration,
    /// Comma separated process-field selection; `None` selects all.
    pub process_fields: Option<String>,
    /// Comma separated sensor-field selection; `None` selects all.
    pub system_fields: Option<String>,
    /// Process-record file; `None` is stdout.
    pub process_output: Option<PathBuf>,
    /// Sensor-record file; `None` is stdout.
    pub system_output: Option<PathBuf>,
    /// Hardware classes written to the system channel.
    pub sensors: Vec<SensorClass>,
    pub min_uid: u32,
    pub proc_path: PathBuf,
    pub sys_path: PathBuf,
    /// Accelerator accounting.
    pub gpu: bool,
    pub syslog_interval: Option<Duration>,
    pub syslog_facility: Facility,
    pub syslog_priority: Priority,
    pub syslog_classes: CategorySet,
    /// Supervised workload, program first.
    pub command: Vec<String>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            process_fields: None,
            system_fields: None,
            process_output: None,
            system_output: None,
            sensors: Vec::new(),
            min_uid: DEFAULT_MIN_UID,
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
            gpu: false,
            syslog_interval: None,
            syslog_facility: Facility::default(),
            syslog_priority: Priority::default(),
            syslog_classes: CategorySet::of(&[Category::Process]),
            command: Vec::new(),
        }
    }
}

impl SamplerConfig {
    /// Overlays every key set in `file`.
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(interval) = file.interval {
            self.interval = interval;
        }
        if let Some(interval) = file.syslog_interval {
            self.syslog_interval = Some(interval);
        }
        if let Some(facility) = file.syslog_facility {
            self.syslog_facility = facility;
        }
        if let Some(priority) = file.syslog_priority {
            self.syslog_priority = priority;
        }
        if let Some(classes) = file.syslog_classes {
            self.syslog_classes = classes;
        }
    }

    /// Categories the system channel writes.
    pub fn system_categories(&self) -> CategorySet {
        let classes: Vec<Category> = self.sensors.iter().map(|c| Category::from(*c)).collect();
        CategorySet::of(&classes)
    }

    /// Low-rate channel settings, or `None` when it is not configured.
    pub fn low_rate(&self) -> Result<Option<LowRateConfig>, ConfigError> {
        let Some(syslog_interval) = self.syslog_interval else {
            return Ok(None);
        };
        let period = Decimator::period_for(self.interval, syslog_interval).ok_or(
            ConfigError::LowRateTooShort {
                interval: self.interval,
                syslog_interval,
            },
        )?;
        Ok(Some(LowRateConfig {
            period,
            facility: self.syslog_facility,
            priority: self.syslog_priority,
            classes: self.syslog_classes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_all_keys() {
        let raw = r#"
            # low-rate snapshot every minute
            interval = 500ms
            syslog_interval = "1m"
            syslog_facility = local3
            syslog_priority = notice

            syslog_classes = process, thermal
        "#;
        let file = ConfigFile::parse(raw).unwrap();
        assert_eq!(file.interval, Some(Duration::from_millis(500)));
        assert_eq!(file.syslog_interval, Some(Duration::from_secs(60)));
        assert_eq!(file.syslog_facility, Some(Facility::Local(3)));
        assert_eq!(file.syslog_priority, Some(Priority::Notice));
        assert_eq!(
            file.syslog_classes,
            Some(CategorySet::of(&[Category::Process, Category::Thermal]))
        );
    }

    #[test]
    fn test_empty_file_sets_nothing() {
        assert_eq!(ConfigFile::parse("\n# nothing\n").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_unknown_key_reports_line() {
        let err = ConfigFile::parse("interval = 1s\n\ncolour = red\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { line: 3, ref key } if key == "colour"));
        assert_eq!(err.to_string(), "line 3: unknown key 'colour'");
    }

    #[test]
    fn test_missing_equals_is_syntax_error() {
        let err = ConfigFile::parse("interval 1s").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_invalid_values() {
        for raw in [
            "interval = 0",
            "syslog_interval = soon",
            "syslog_facility = kern",
            "syslog_priority = loud",
            "syslog_classes = process,gpu",
            "syslog_classes = ",
        ] {
            let err = ConfigFile::parse(raw).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { line: 1, .. }),
                "{}: {}",
                raw,
                err
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval = 2s").unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.interval, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load(Path::new("/nonexistent/lockstep.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(..)));
    }

    #[test]
    fn test_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.min_uid, 1000);
        assert!(config.sensors.is_empty());
        assert!(config.system_categories().is_empty());
        assert!(config.low_rate().unwrap().is_none());
    }

    #[test]
    fn test_apply_file_overlays_set_keys() {
        let mut config = SamplerConfig::default();
        let file = ConfigFile::parse("syslog_interval = 10s\nsyslog_priority = debug").unwrap();
        config.apply_file(file);

        assert_eq!(config.interval, Duration::from_secs(1));
        let low = config.low_rate().unwrap().unwrap();
        assert_eq!(low.period, 10);
        assert_eq!(low.priority, Priority::Debug);
        assert_eq!(low.facility, Facility::User);
        assert_eq!(low.classes, CategorySet::of(&[Category::Process]));
    }

    #[test]
    fn test_low_rate_shorter_than_interval_rejected() {
        let config = SamplerConfig {
            interval: Duration::from_secs(5),
            syslog_interval: Some(Duration::from_secs(1)),
            ..Default::default()
        };
        assert!(matches!(
            config.low_rate(),
            Err(ConfigError::LowRateTooShort { .. })
        ));
    }

    #[test]
    fn test_system_categories_follow_sensors() {
        let config = SamplerConfig {
            sensors: vec![SensorClass::Hwmon, SensorClass::Drm],
            ..Default::default()
        };
        let set = config.system_categories();
        assert!(set.contains(Category::Hwmon));
        assert!(set.contains(Category::Drm));
        assert!(!set.contains(Category::Thermal));
    }
}
