//! Hardware sensor reading: one record per attribute file per tick.

use std::fmt;
use std::str::FromStr;

/// Hardware monitoring class under `/sys/class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorClass {
    Hwmon,
    Thermal,
    Drm,
}

impl SensorClass {
    /// Every class, in the order the sampler visits them.
    pub const ALL: [SensorClass; 3] = [SensorClass::Hwmon, SensorClass::Thermal, SensorClass::Drm];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorClass::Hwmon => "hwmon",
            SensorClass::Thermal => "thermal",
            SensorClass::Drm => "drm",
        }
    }
}

impl fmt::Display for SensorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hwmon" => Ok(SensorClass::Hwmon),
            "thermal" => Ok(SensorClass::Thermal),
            "drm" => Ok(SensorClass::Drm),
            other => Err(format!("unknown sensor class '{}'", other)),
        }
    }
}

/// One attribute file read at one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub timestamp: i64,
    pub class: SensorClass,
    /// Path of the primary value file.
    pub path: String,
    /// Raw value as exposed by the kernel (millidegrees, rpm, bytes, ...).
    pub value: i64,
    /// Contents of the `*_label` sibling, empty when absent.
    pub label: String,
    /// Contents of the device `name`/`type` sibling, empty when absent.
    pub name: String,
}

impl SensorReading {
    pub fn class_name(&self) -> &str {
        self.class.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_class_round_trip_names() {
        for class in SensorClass::ALL {
            assert_eq!(class.as_str().parse::<SensorClass>().unwrap(), class);
        }
        assert!("gpu".parse::<SensorClass>().is_err());
    }
}
