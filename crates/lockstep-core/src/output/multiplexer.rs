//! Routes rendered records to the process channel, the system channel and
//! the decimated low-rate forwarder.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::sink::{Sink, SinkError};
use crate::model::SensorClass;

/// Kind of record a sink can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Process,
    Hwmon,
    Thermal,
    Drm,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Process,
        Category::Hwmon,
        Category::Thermal,
        Category::Drm,
    ];

    fn bit(self) -> u8 {
        match self {
            Category::Process => 1,
            Category::Hwmon => 2,
            Category::Thermal => 4,
            Category::Drm => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Process => "process",
            Category::Hwmon => "hwmon",
            Category::Thermal => "thermal",
            Category::Drm => "drm",
        }
    }
}

impl From<SensorClass> for Category {
    fn from(class: SensorClass) -> Self {
        match class {
            SensorClass::Hwmon => Category::Hwmon,
            SensorClass::Thermal => Category::Thermal,
            SensorClass::Drm => Category::Drm,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown record class '{}'", s))
    }
}

/// Small set of categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategorySet(u8);

impl CategorySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(categories: &[Category]) -> Self {
        let mut set = Self::empty();
        for c in categories {
            set.insert(*c);
        }
        set
    }

    pub fn insert(&mut self, category: Category) {
        self.0 |= category.bit();
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(&self, other: CategorySet) -> CategorySet {
        CategorySet(self.0 | other.0)
    }

    /// Parses a comma separated list such as `process,hwmon`.
    pub fn parse_list(list: &str) -> Result<Self, String> {
        let mut set = Self::empty();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            set.insert(name.parse()?);
        }
        Ok(set)
    }
}

/// Gate that opens once every `period` ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimator {
    period: u64,
    counter: u64,
}

impl Decimator {
    /// `period` of zero is treated as one.
    pub fn new(period: u64) -> Self {
        Self {
            period: period.max(1),
            counter: 0,
        }
    }

    /// `floor(low / base)`, or `None` when the low-rate interval is shorter
    /// than the base interval.
    pub fn period_for(base: Duration, low: Duration) -> Option<u64> {
        if base.is_zero() {
            return None;
        }
        let period = (low.as_micros() / base.as_micros()) as u64;
        (period >= 1).then_some(period)
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// Advances one tick; true on every `period`-th call.
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.period {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}

/// Low-rate forwarding path.
pub struct Forwarder {
    sink: Box<dyn Sink>,
    categories: CategorySet,
    decimator: Decimator,
}

impl Forwarder {
    pub fn new(sink: Box<dyn Sink>, categories: CategorySet, decimator: Decimator) -> Self {
        Self {
            sink,
            categories,
            decimator,
        }
    }
}

/// Output multiplexer.
///
/// Process records always go to the process channel. Sensor records go to
/// the system channel for the classes it requests. The forwarder receives
/// its categories only on armed ticks; arming is decided by
/// [`Multiplexer::begin_tick`] and holds for the whole tick.
pub struct Multiplexer {
    process: Box<dyn Sink>,
    system: Box<dyn Sink>,
    system_classes: CategorySet,
    forwarder: Option<Forwarder>,
    armed: bool,
}

impl Multiplexer {
    pub fn new(process: Box<dyn Sink>, system: Box<dyn Sink>, system_classes: CategorySet) -> Self {
        Self {
            process,
            system,
            system_classes,
            forwarder: None,
            armed: false,
        }
    }

    pub fn with_forwarder(mut self, forwarder: Forwarder) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Decides whether the forwarder is armed for the tick that starts now.
    pub fn begin_tick(&mut self) -> bool {
        self.armed = match &mut self.forwarder {
            Some(forwarder) => forwarder.decimator.tick(),
            None => false,
        };
        self.armed
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn direct(&self, category: Category) -> bool {
        category == Category::Process || self.system_classes.contains(category)
    }

    fn forwarded(&self, category: Category) -> bool {
        self.armed
            && self
                .forwarder
                .as_ref()
                .is_some_and(|f| f.categories.contains(category))
    }

    /// Whether any sink wants `category` during the current tick.
    pub fn wants(&self, category: Category) -> bool {
        self.direct(category) || self.forwarded(category)
    }

    /// Writes one rendered record to every sink that wants it.
    pub fn emit(&mut self, category: Category, line: &str) -> Result<(), SinkError> {
        if self.direct(category) {
            if category == Category::Process {
                self.process.write_record(line)?;
            } else {
                self.system.write_record(line)?;
            }
        }
        if self.forwarded(category)
            && let Some(forwarder) = &mut self.forwarder
        {
            forwarder.sink.write_record(line)?;
        }
        Ok(())
    }

    /// Flushes every sink; called at the end of each tick.
    pub fn flush(&mut self) -> Result<(), SinkError> {
        self.process.flush()?;
        self.system.flush()?;
        if let Some(forwarder) = &mut self.forwarder {
            forwarder.sink.flush()?;
        }
        Ok(())
    }
}
