//! Name-indexed field registry over fixed record layouts.
//!
//! A [`Field`] pairs a name with a typed getter. The getter variant fixes the
//! field's [`Kind`], so rendering dispatches on the variant alone and the
//! name → kind → value mapping cannot disagree. Registries are built once at
//! startup; user selections are resolved to indices before the first tick.

mod catalog;
mod render;

pub use catalog::{GPU_FIELDS, PROCESS_FIELDS, SENSOR_FIELDS};
pub use render::{DELIMITER, MAX_TEXT_LEN, Serializer};

use std::fmt;

use crate::model::{ProcessSample, SensorReading};

/// Value kind of a field. Each kind has exactly one rendering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    SignedInt,
    UnsignedInt,
    Char,
    Long64Signed,
    Long64Unsigned,
    Double,
}

/// Typed accessor into a record of type `R`.
pub enum Getter<R> {
    Str(fn(&R) -> &str),
    Int(fn(&R) -> i32),
    UInt(fn(&R) -> u32),
    Char(fn(&R) -> char),
    Long(fn(&R) -> i64),
    ULong(fn(&R) -> u64),
    Double(fn(&R) -> f64),
}

impl<R> Clone for Getter<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Getter<R> {}

impl<R> Getter<R> {
    pub fn kind(&self) -> Kind {
        match self {
            Getter::Str(_) => Kind::String,
            Getter::Int(_) => Kind::SignedInt,
            Getter::UInt(_) => Kind::UnsignedInt,
            Getter::Char(_) => Kind::Char,
            Getter::Long(_) => Kind::Long64Signed,
            Getter::ULong(_) => Kind::Long64Unsigned,
            Getter::Double(_) => Kind::Double,
        }
    }
}

/// Registry entry: a field name and how to read it.
pub struct Field<R> {
    pub name: &'static str,
    pub getter: Getter<R>,
}

impl<R> Clone for Field<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Field<R> {}

impl<R> Field<R> {
    pub const fn new(name: &'static str, getter: Getter<R>) -> Self {
        Self { name, getter }
    }

    pub fn kind(&self) -> Kind {
        self.getter.kind()
    }
}

impl<R> fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Error type for field resolution failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Name not present in the registry.
    Unknown(String),
    /// Selection list contained an empty item (e.g. `pid,,state`).
    Empty,
    /// Registry was built with two fields of the same name.
    Duplicate(&'static str),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Unknown(name) => write!(f, "bad field: {}", name),
            FieldError::Empty => write!(f, "bad field: empty name in field list"),
            FieldError::Duplicate(name) => write!(f, "duplicate field in registry: {}", name),
        }
    }
}

impl std::error::Error for FieldError {}

/// Ordered sequence of fields, unique by name.
#[derive(Debug, Clone)]
pub struct Registry<R> {
    fields: Vec<Field<R>>,
}

impl<R> Registry<R> {
    /// Builds a registry from one or more field tables, in order.
    pub fn from_tables(tables: &[&[Field<R>]]) -> Result<Self, FieldError> {
        let mut fields: Vec<Field<R>> = Vec::new();
        for field in tables.iter().flat_map(|t| t.iter()) {
            if fields.iter().any(|f| f.name == field.name) {
                return Err(FieldError::Duplicate(field.name));
            }
            fields.push(*field);
        }
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Field<R>> {
        self.fields.get(index)
    }

    pub fn fields(&self) -> &[Field<R>] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Resolves a field name to its registry index.
    pub fn lookup(&self, name: &str) -> Result<usize, FieldError> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| FieldError::Unknown(name.to_string()))
    }

    /// Parses a comma-separated field list into a selection.
    ///
    /// Fails on the first name the registry does not know.
    pub fn select(&self, list: &str) -> Result<Selection, FieldError> {
        let mut indices = Vec::new();
        for name in list.split(',') {
            let name = name.trim();
            if name.is_empty() {
                return Err(FieldError::Empty);
            }
            indices.push(self.lookup(name)?);
        }
        Ok(Selection { indices })
    }

    /// Selection of every field in registry order.
    pub fn select_all(&self) -> Selection {
        Selection {
            indices: (0..self.fields.len()).collect(),
        }
    }
}

impl Registry<ProcessSample> {
    /// Process registry, with accelerator fields appended when enabled.
    pub fn process(with_gpu: bool) -> Self {
        let tables: &[&[Field<ProcessSample>]] = if with_gpu {
            &[PROCESS_FIELDS, GPU_FIELDS]
        } else {
            &[PROCESS_FIELDS]
        };
        Self {
            fields: tables.iter().flat_map(|t| t.iter().copied()).collect(),
        }
    }
}

impl Registry<SensorReading> {
    pub fn sensor() -> Self {
        Self {
            fields: SENSOR_FIELDS.to_vec(),
        }
    }
}

/// Resolved, ordered list of registry indices. Built once, reused every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    indices: Vec<usize>,
}

impl Selection {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_registry_names_are_unique() {
        let registry = Registry::process(true);
        let tables: &[&[Field<ProcessSample>]] = &[PROCESS_FIELDS, GPU_FIELDS];
        assert!(Registry::from_tables(tables).is_ok());
        assert_eq!(registry.len(), PROCESS_FIELDS.len() + GPU_FIELDS.len());
    }

    #[test]
    fn test_duplicate_tables_rejected() {
        let tables: &[&[Field<ProcessSample>]] = &[PROCESS_FIELDS, PROCESS_FIELDS];
        assert_eq!(
            Registry::from_tables(tables).unwrap_err(),
            FieldError::Duplicate("pid")
        );
    }

    #[test]
    fn test_lookup_kinds() {
        let registry = Registry::process(false);
        let kind_of = |name: &str| registry.get(registry.lookup(name).unwrap()).unwrap().kind();

        assert_eq!(kind_of("pid"), Kind::SignedInt);
        assert_eq!(kind_of("state"), Kind::Char);
        assert_eq!(kind_of("flags"), Kind::UnsignedInt);
        assert_eq!(kind_of("child_userspace_time"), Kind::Long64Signed);
        assert_eq!(kind_of("read_bytes"), Kind::Long64Unsigned);
        assert_eq!(kind_of("uptime"), Kind::Double);
        assert_eq!(kind_of("executable"), Kind::String);
    }

    #[test]
    fn test_gpu_fields_only_when_enabled() {
        assert!(Registry::process(false).lookup("gpu_time_ms").is_err());
        assert!(Registry::process(true).lookup("gpu_time_ms").is_ok());
    }

    #[test]
    fn test_select_preserves_order() {
        let registry = Registry::process(false);
        let selection = registry.select("command,pid,state").unwrap();
        let names: Vec<&str> = selection
            .indices()
            .iter()
            .map(|&i| registry.get(i).unwrap().name)
            .collect();
        assert_eq!(names, vec!["command", "pid", "state"]);
    }

    #[test]
    fn test_select_unknown_names_the_field() {
        let registry = Registry::process(false);
        let err = registry.select("pid,bogus,state").unwrap_err();
        assert_eq!(err, FieldError::Unknown("bogus".to_string()));
        assert_eq!(err.to_string(), "bad field: bogus");
    }

    #[test]
    fn test_select_empty_item_rejected() {
        let registry = Registry::sensor();
        assert_eq!(registry.select("path,,value"), Err(FieldError::Empty));
        assert_eq!(registry.select(""), Err(FieldError::Empty));
    }

    #[test]
    fn test_select_all_covers_registry() {
        let registry = Registry::sensor();
        let all = registry.select_all();
        assert_eq!(all.indices(), &[0, 1, 2, 3, 4, 5]);
    }
}
