//! Hardware sensor readers over `/sys/class/{hwmon,thermal,drm}`.
//!
//! Class entries are enumerated by name prefix on every call. A primary
//! value file that cannot be read or parsed skips that one reading; a
//! missing `label`/`name`/`type` sibling only leaves the decoration empty.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::collector::traits::FileSystem;
use crate::model::{SensorClass, SensorReading};

/// Reads sensor attribute files below a sysfs root.
pub struct SensorReader<F: FileSystem> {
    fs: F,
    sys_path: PathBuf,
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

impl<F: FileSystem> SensorReader<F> {
    /// Creates a reader rooted at `sys_path` (usually "/sys").
    pub fn new(fs: F, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            sys_path: sys_path.into(),
        }
    }

    /// Collects every reading of one class.
    pub fn collect(&self, class: SensorClass, timestamp: i64) -> Vec<SensorReading> {
        let mut readings = Vec::new();
        for entry in self.class_entries(class) {
            match class {
                SensorClass::Hwmon => self.collect_hwmon(&entry, timestamp, &mut readings),
                SensorClass::Thermal => self.collect_thermal(&entry, timestamp, &mut readings),
                SensorClass::Drm => self.collect_drm(&entry, timestamp, &mut readings),
            }
        }
        readings
    }

    /// Lists class entries matching the class prefix, sorted by path.
    fn class_entries(&self, class: SensorClass) -> Vec<PathBuf> {
        let (dir, prefix) = match class {
            SensorClass::Hwmon => ("class/hwmon", "hwmon"),
            SensorClass::Thermal => ("class/thermal", "thermal_zone"),
            SensorClass::Drm => ("class/drm", "card"),
        };
        let dir = self.sys_path.join(dir);
        let mut entries = match self.fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("{} not available: {}", dir.display(), e);
                return Vec::new();
            }
        };
        entries.retain(|p| {
            file_name(p).is_some_and(|name| {
                // DRM connectors (card0-DP-1) share the card prefix.
                name.starts_with(prefix) && !(class == SensorClass::Drm && name.contains('-'))
            })
        });
        entries.sort();
        entries
    }

    /// Lists files in `dir` accepted by `keep`, sorted by path.
    fn attribute_files(&self, dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<PathBuf> {
        let mut files = match self.fs.read_dir(dir) {
            Ok(files) => files,
            Err(e) => {
                debug!("unable to list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };
        files.retain(|p| file_name(p).is_some_and(&keep));
        files.sort();
        files
    }

    fn read_value(&self, path: &Path) -> Option<i64> {
        let content = match self.fs.read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("unable to read {}: {}", path.display(), e);
                return None;
            }
        };
        match content.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                debug!("unparsable value in {}: {:?}", path.display(), content.trim());
                None
            }
        }
    }

    fn read_decoration(&self, path: &Path) -> String {
        self.fs
            .read_to_string(path)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn reading(
        &self,
        class: SensorClass,
        timestamp: i64,
        path: &Path,
        label: String,
        name: String,
    ) -> Option<SensorReading> {
        let value = self.read_value(path)?;
        Some(SensorReading {
            timestamp,
            class,
            path: path.to_string_lossy().into_owned(),
            value,
            label,
            name,
        })
    }

    fn collect_hwmon(&self, entry: &Path, timestamp: i64, out: &mut Vec<SensorReading>) {
        let name = self.read_decoration(&entry.join("name"));
        for input in self.attribute_files(entry, |n| n.ends_with("_input")) {
            let label = file_name(&input)
                .and_then(|n| n.strip_suffix("_input"))
                .map(|stem| self.read_decoration(&entry.join(format!("{}_label", stem))))
                .unwrap_or_default();
            out.extend(self.reading(SensorClass::Hwmon, timestamp, &input, label, name.clone()));
        }
    }

    fn collect_thermal(&self, entry: &Path, timestamp: i64, out: &mut Vec<SensorReading>) {
        let name = self.read_decoration(&entry.join("type"));
        let temp = entry.join("temp");
        out.extend(self.reading(SensorClass::Thermal, timestamp, &temp, String::new(), name));
    }

    fn collect_drm(&self, entry: &Path, timestamp: i64, out: &mut Vec<SensorReading>) {
        let device = entry.join("device");
        let name = self.read_decoration(&device.join("product_name"));
        for counter in self.attribute_files(&device, |n| n.starts_with("mem_info_")) {
            out.extend(self.reading(
                SensorClass::Drm,
                timestamp,
                &counter,
                String::new(),
                name.clone(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    fn reader() -> SensorReader<MockFs> {
        SensorReader::new(MockFs::sensor_tree(), "/sys")
    }

    #[test]
    fn test_hwmon_readings_with_decorations() {
        let readings = reader().collect(SensorClass::Hwmon, 7);
        let summary: Vec<(&str, i64, &str, &str)> = readings
            .iter()
            .map(|r| (r.path.as_str(), r.value, r.label.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("/sys/class/hwmon/hwmon0/temp1_input", 45000, "Package id 0", "coretemp"),
                ("/sys/class/hwmon/hwmon0/temp2_input", 43000, "Core 0", "coretemp"),
                ("/sys/class/hwmon/hwmon1/fan1_input", 1200, "", ""),
            ]
        );
        assert!(readings.iter().all(|r| r.timestamp == 7));
    }

    #[test]
    fn test_unparsable_value_skips_only_that_reading() {
        let readings = reader().collect(SensorClass::Hwmon, 0);
        assert!(!readings.iter().any(|r| r.path.ends_with("temp3_input")));
        assert_eq!(readings.len(), 3);
    }

    #[test]
    fn test_thermal_zone_uses_type_as_name() {
        let readings = reader().collect(SensorClass::Thermal, 0);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].path, "/sys/class/thermal/thermal_zone0/temp");
        assert_eq!(readings[0].value, 38000);
        assert_eq!(readings[0].name, "acpitz");
        assert_eq!(readings[0].label, "");
    }

    #[test]
    fn test_drm_skips_connectors_and_render_nodes() {
        let readings = reader().collect(SensorClass::Drm, 0);
        let paths: Vec<&str> = readings.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/sys/class/drm/card0/device/mem_info_vram_total",
                "/sys/class/drm/card0/device/mem_info_vram_used",
            ]
        );
        assert!(readings.iter().all(|r| r.name == "Radeon RX 6600"));
    }

    #[test]
    fn test_missing_class_directory_is_empty() {
        let reader = SensorReader::new(MockFs::new(), "/sys");
        for class in SensorClass::ALL {
            assert!(reader.collect(class, 0).is_empty());
        }
    }

    #[test]
    fn test_vanished_value_file_skips_reading() {
        let mut fs = MockFs::sensor_tree();
        fs.remove_file("/sys/class/thermal/thermal_zone0/temp");
        let reader = SensorReader::new(fs, "/sys");
        assert!(reader.collect(SensorClass::Thermal, 0).is_empty());
    }
}
