//! In-memory imageset records.
//!
//! A record is the top-level fields of an imageset plus its named sections.
//! Nothing here touches the disk; see [`text`] for the TOML codec.

pub mod batch;
pub mod text;

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub use batch::{BatchUpdate, UpdateField};
pub use text::TextRecordStore;

/// Key/value payload of a section, JSON-compatible.
pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    New,
    Keep,
    Edit,
    Working,
    Posted,
    Archive,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::New,
        Status::Keep,
        Status::Edit,
        Status::Working,
        Status::Posted,
        Status::Archive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::Keep => "keep",
            Status::Edit => "edit",
            Status::Working => "working",
            Status::Posted => "posted",
            Status::Archive => "archive",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The generator that produced an imageset's original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Source {
    Midjourney,
    Fooocus,
    Freepik,
    Other,
    #[default]
    Unknown,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Midjourney,
        Source::Fooocus,
        Source::Freepik,
        Source::Other,
        Source::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Midjourney => "midjourney",
            Source::Fooocus => "fooocus",
            Source::Freepik => "freepik",
            Source::Other => "other",
            Source::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Source::Unknown
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Source::Unknown);
        }
        Source::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown source '{}'", s))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const REVIEW: &str = "review";
pub const BIZ: &str = "biz";
pub const INTERVIEW: &str = "interview";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSection {
    pub needs: String,
    pub extra: Fields,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BizSection {
    pub good_for: String,
    pub posted_to: String,
    pub extra: Fields,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterviewSection {
    pub interview_date: String,
    pub template_used: String,
    pub title: String,
    pub description: String,
    pub extra: Fields,
}

/// A named group of fields on an imageset.
///
/// The three well-known sections have typed fields; source sections and any
/// hand-added table are open maps. Known sections still carry unrecognized
/// keys in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Review(ReviewSection),
    Biz(BizSection),
    Interview(InterviewSection),
    Open(Fields),
}

impl Section {
    /// Build the section called `name` from raw fields.
    pub fn from_fields(name: &str, fields: Fields) -> Section {
        let mut section = match name {
            REVIEW => Section::Review(ReviewSection::default()),
            BIZ => Section::Biz(BizSection::default()),
            INTERVIEW => Section::Interview(InterviewSection::default()),
            _ => Section::Open(Fields::new()),
        };
        for (key, value) in fields {
            section.set(&key, value);
        }
        section
    }

    fn known_slot(&mut self, key: &str) -> Option<&mut String> {
        match self {
            Section::Review(s) => match key {
                "needs" => Some(&mut s.needs),
                _ => None,
            },
            Section::Biz(s) => match key {
                "good_for" => Some(&mut s.good_for),
                "posted_to" => Some(&mut s.posted_to),
                _ => None,
            },
            Section::Interview(s) => match key {
                "interview_date" => Some(&mut s.interview_date),
                "template_used" => Some(&mut s.template_used),
                "title" => Some(&mut s.title),
                "description" => Some(&mut s.description),
                _ => None,
            },
            Section::Open(_) => None,
        }
    }

    fn extra_mut(&mut self) -> &mut Fields {
        match self {
            Section::Review(s) => &mut s.extra,
            Section::Biz(s) => &mut s.extra,
            Section::Interview(s) => &mut s.extra,
            Section::Open(fields) => fields,
        }
    }

    /// Set one key. Known fields are coerced to strings.
    pub fn set(&mut self, key: &str, value: Value) {
        match self.known_slot(key) {
            Some(slot) => *slot = coerce_to_string(&value),
            None => {
                self.extra_mut().insert(key.to_string(), value);
            }
        }
    }

    /// Flattened view: known fields (when non-empty) followed by extras.
    pub fn fields(&self) -> Fields {
        let (known, extra): (Vec<(&str, &String)>, &Fields) = match self {
            Section::Review(s) => (vec![("needs", &s.needs)], &s.extra),
            Section::Biz(s) => (
                vec![("good_for", &s.good_for), ("posted_to", &s.posted_to)],
                &s.extra,
            ),
            Section::Interview(s) => (
                vec![
                    ("interview_date", &s.interview_date),
                    ("template_used", &s.template_used),
                    ("title", &s.title),
                    ("description", &s.description),
                ],
                &s.extra,
            ),
            Section::Open(fields) => (Vec::new(), fields),
        };

        let mut out = extra.clone();
        for (key, value) in known {
            if !value.is_empty() {
                out.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        out
    }

    /// Key lookup ignoring ASCII case, returned as a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.fields()
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| coerce_to_string(&v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

/// Key of the single-entry object that stands in for a TOML datetime.
///
/// Same key `toml` itself uses when a datetime passes through serde, so the
/// section data stored as JSON still says which strings were dates.
pub const DATETIME_KEY: &str = "$__toml_private_datetime";

pub fn datetime_value(text: &str) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(DATETIME_KEY.to_string(), Value::String(text.to_string()));
    Value::Object(map)
}

/// The datetime text of a value built by [`datetime_value`].
pub fn datetime_text(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get(DATETIME_KEY).and_then(Value::as_str),
        _ => None,
    }
}

/// Render a JSON value as a plain string: scalars as text, arrays joined with `, `.
pub fn coerce_to_string(value: &Value) -> String {
    if let Some(text) = datetime_text(value) {
        return text.to_string();
    }
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(coerce_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Location of one field: top-level when `section` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    pub section: Option<String>,
    pub key: String,
}

impl FieldPath {
    pub fn top(key: &str) -> Self {
        Self {
            section: None,
            key: key.to_string(),
        }
    }

    pub fn in_section(section: &str, key: &str) -> Self {
        Self {
            section: Some(section.to_string()),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section {
            Some(section) => write!(f, "{}.{}", section, self.key),
            None => f.write_str(&self.key),
        }
    }
}

/// Everything known about one imageset.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagesetRecord {
    pub imageset: String,
    /// `None` when the record never stated one.
    pub status: Option<Status>,
    pub edits: String,
    pub needs: String,
    pub source: Source,
    pub sections: BTreeMap<String, Section>,
    /// Unrecognized top-level values, kept so hand edits survive a rewrite.
    pub extras: BTreeMap<String, toml::Value>,
}

impl ImagesetRecord {
    pub fn empty(name: &str) -> Self {
        Self {
            imageset: name.to_string(),
            status: None,
            edits: String::new(),
            needs: String::new(),
            source: Source::Unknown,
            sections: BTreeMap::new(),
            extras: BTreeMap::new(),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// The generation prompt from the source section, matched case-insensitively.
    pub fn prompt(&self) -> Option<String> {
        if !self.source.is_known() {
            return None;
        }
        self.section(self.source.as_str())
            .and_then(|section| section.get_str("prompt"))
            .filter(|prompt| !prompt.trim().is_empty())
    }

    pub fn good_for(&self) -> Option<String> {
        match self.section(BIZ) {
            Some(Section::Biz(biz)) if !biz.good_for.is_empty() => Some(biz.good_for.clone()),
            _ => None,
        }
    }

    pub fn template_used(&self) -> Option<String> {
        match self.section(INTERVIEW) {
            Some(Section::Interview(i)) if !i.template_used.trim().is_empty() => {
                Some(i.template_used.trim().to_string())
            }
            _ => None,
        }
    }

    /// Overlay `incoming` onto `existing`.
    ///
    /// Only non-empty incoming values win; sections and keys missing from
    /// `incoming` stay as they are.
    pub fn merge(existing: &ImagesetRecord, incoming: &ImagesetRecord) -> ImagesetRecord {
        let mut merged = existing.clone();

        if !incoming.imageset.is_empty() {
            merged.imageset = incoming.imageset.clone();
        }
        if incoming.status.is_some() {
            merged.status = incoming.status;
        }
        if !incoming.edits.is_empty() {
            merged.edits = incoming.edits.clone();
        }
        if !incoming.needs.is_empty() {
            merged.needs = incoming.needs.clone();
        }
        if incoming.source.is_known() {
            merged.source = incoming.source;
        }

        for (name, section) in &incoming.sections {
            let target = merged
                .sections
                .entry(name.clone())
                .or_insert_with(|| Section::from_fields(name, Fields::new()));
            for (key, value) in section.fields() {
                if !is_blank(&value) {
                    target.set(&key, value);
                }
            }
        }
        merged.sections.retain(|_, section| !section.is_empty());

        for (key, value) in &incoming.extras {
            merged.extras.insert(key.clone(), value.clone());
        }

        merged
    }

    /// Every field whose value differs between `a` and `b`.
    pub fn diff(a: &ImagesetRecord, b: &ImagesetRecord) -> BTreeSet<FieldPath> {
        let mut changed = BTreeSet::new();

        if a.imageset != b.imageset {
            changed.insert(FieldPath::top("imageset"));
        }
        if a.status != b.status {
            changed.insert(FieldPath::top("status"));
        }
        if a.edits != b.edits {
            changed.insert(FieldPath::top("edits"));
        }
        if a.needs != b.needs {
            changed.insert(FieldPath::top("needs"));
        }
        if a.source != b.source {
            changed.insert(FieldPath::top("source"));
        }

        let extra_keys: BTreeSet<&String> = a.extras.keys().chain(b.extras.keys()).collect();
        for key in extra_keys {
            if a.extras.get(key) != b.extras.get(key) {
                changed.insert(FieldPath::top(key));
            }
        }

        let names: BTreeSet<&String> = a.sections.keys().chain(b.sections.keys()).collect();
        for name in names {
            let left = a.sections.get(name).map(Section::fields).unwrap_or_default();
            let right = b.sections.get(name).map(Section::fields).unwrap_or_default();
            let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
            for key in keys {
                if left.get(key) != right.get(key) {
                    changed.insert(FieldPath::in_section(name, key));
                }
            }
        }

        changed
    }
}
