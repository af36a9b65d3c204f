//! In-memory Typst world for report compilation.
//!
//! A report compiles from one template string plus injected inputs, so the
//! world never touches the filesystem: the only resolvable file is the main
//! source and fonts come from the embedded cache. `datetime.today()` is
//! backed by an injected timestamp, not the wall clock, so a stored analysis
//! always renders to the same bytes.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::Value as JsonValue;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Array, Bytes, Datetime, Dict, Value};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, World};

use crate::report::fonts::{global_font_cache, FontCache};

pub struct ReportWorld {
    source: Source,
    library: LazyHash<Library>,
    font_cache: &'static FontCache,
    now: DateTime<Utc>,
}

impl ReportWorld {
    pub fn new(template: &str, inputs: Dict, now: DateTime<Utc>) -> Self {
        let id = FileId::new(None, VirtualPath::new("/main.typ"));
        let library = Library::builder().with_inputs(inputs).build();

        Self {
            source: Source::new(id, template.to_string()),
            library: LazyHash::new(library),
            font_cache: global_font_cache(),
            now,
        }
    }
}

impl World for ReportWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        self.font_cache.book()
    }

    fn main(&self) -> FileId {
        self.source.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.source.id() {
            Ok(self.source.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    // Templates cannot import packages or read data files.
    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.font_cache.font(index)
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        let at = self.now + chrono::Duration::hours(offset.unwrap_or(0));
        Datetime::from_ymd_hms(
            at.year(),
            at.month() as u8,
            at.day() as u8,
            at.hour() as u8,
            at.minute() as u8,
            at.second() as u8,
        )
    }
}

/// Convert a JSON value into its Typst counterpart so the template can read
/// it through `sys.inputs`.
pub fn json_to_typst_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::None,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => Value::Str(s.as_str().into()),
        JsonValue::Array(items) => {
            let converted: Vec<Value> = items.iter().map(json_to_typst_value).collect();
            Value::Array(Array::from(converted.as_slice()))
        }
        JsonValue::Object(map) => {
            let mut dict = Dict::new();
            for (key, item) in map {
                dict.insert(key.as_str().into(), json_to_typst_value(item));
            }
            Value::Dict(dict)
        }
    }
}
