//! Rendering of records into delimited text lines.

use std::fmt::Write;

use super::{Field, Getter, Registry, Selection};

/// Separator between rendered fields.
pub const DELIMITER: char = '|';

/// Longest text value rendered, in bytes.
pub const MAX_TEXT_LEN: usize = 4095;

impl<R> Field<R> {
    /// Appends this field's value for `record` to `out`.
    pub fn render(&self, record: &R, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self.getter {
            Getter::Str(get) => {
                push_text(out, get(record));
                Ok(())
            }
            Getter::Int(get) => write!(out, "{}", get(record)),
            Getter::UInt(get) => write!(out, "{}", get(record)),
            Getter::Char(get) => {
                out.push(sanitize(get(record)));
                Ok(())
            }
            Getter::Long(get) => write!(out, "{}", get(record)),
            Getter::ULong(get) => write!(out, "{}", get(record)),
            Getter::Double(get) => write!(out, "{:.6}", get(record)),
        };
    }
}

/// Pushes at most [`MAX_TEXT_LEN`] bytes of `text`, cut on a char boundary,
/// with characters that would break the line format replaced.
fn push_text(out: &mut String, text: &str) {
    let mut end = text.len().min(MAX_TEXT_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    out.extend(text[..end].chars().map(sanitize));
}

fn sanitize(c: char) -> char {
    match c {
        DELIMITER | '\n' | '\r' => '_',
        c => c,
    }
}

/// Renders records of one type with a fixed field selection.
#[derive(Debug, Clone)]
pub struct Serializer<R> {
    registry: Registry<R>,
    selection: Selection,
}

impl<R> Serializer<R> {
    /// Creates a serializer; `None` selects every field in registry order.
    pub fn new(registry: Registry<R>, selection: Option<Selection>) -> Self {
        let selection = selection.unwrap_or_else(|| registry.select_all());
        Self {
            registry,
            selection,
        }
    }

    pub fn registry(&self) -> &Registry<R> {
        &self.registry
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Renders `record` as one line, terminated by `\n`, into `out`.
    ///
    /// `out` is cleared first so one buffer can be reused across records.
    pub fn render_line(&self, record: &R, out: &mut String) {
        out.clear();
        let fields = self.registry.fields();
        for (n, &index) in self.selection.indices().iter().enumerate() {
            if n > 0 {
                out.push(DELIMITER);
            }
            // Indices come from the same registry, see `Registry::select`.
            if let Some(field) = fields.get(index) {
                field.render(record, out);
            }
        }
        out.push('\n');
    }
}
