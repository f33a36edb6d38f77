//! Record model and the newline-delimited text format stored inside the envelope.
//!
//! One record per line: `key=value`, optionally followed by [`TAG_SEPARATOR`] and a tag.

use crate::storage::StoreError;

/// Separates a value from its tag on a record line (ESC, 0x1B).
pub const TAG_SEPARATOR: char = '\x1b';

/// A single key/value entry, optionally scoped by a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: String,
    /// `None` is the untagged scope.
    pub tag: Option<String>,
}

impl Record {
    /// Build a record, rejecting content the line format cannot represent.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        tag: Option<String>,
    ) -> Result<Self, StoreError> {
        let record = Self {
            key: key.into(),
            value: value.into(),
            tag: tag.filter(|t| !t.is_empty()),
        };
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.key.is_empty() {
            return Err(invalid("key must not be empty"));
        }
        if self.key.contains('=') {
            return Err(invalid("key must not contain '='"));
        }
        if has_line_break_or_separator(&self.key) {
            return Err(invalid("key must not contain line breaks or control separators"));
        }
        if has_line_break_or_separator(&self.value) {
            return Err(invalid("value must not contain line breaks or control separators"));
        }
        if let Some(tag) = &self.tag {
            if has_line_break_or_separator(tag) {
                return Err(invalid("tag must not contain line breaks or control separators"));
            }
        }
        Ok(())
    }

    /// True when the record lives in exactly this tag scope.
    pub fn in_scope(&self, tag: Option<&str>) -> bool {
        self.tag.as_deref() == normalize_tag(tag)
    }

    /// Render as a single line without the trailing newline.
    pub fn to_line(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}={}{}{}", self.key, self.value, TAG_SEPARATOR, tag),
            None => format!("{}={}", self.key, self.value),
        }
    }

    /// Parse one line: split on the first `=`, then on the last separator.
    pub fn from_line(line: &str) -> Result<Self, StoreError> {
        let (key, rest) = line.split_once('=').ok_or_else(|| StoreError::Format {
            reason: "record line has no '=' separator".to_string(),
        })?;
        if key.is_empty() {
            return Err(StoreError::Format {
                reason: "record line has an empty key".to_string(),
            });
        }
        let (value, tag) = match rest.rfind(TAG_SEPARATOR) {
            Some(idx) => (&rest[..idx], Some(rest[idx + 1..].to_string())),
            None => (rest, None),
        };
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            tag: tag.filter(|t| !t.is_empty()),
        })
    }
}

/// Tag scope used by `list` and `dump`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagFilter {
    /// Every record regardless of tag.
    #[default]
    Any,
    /// Only records without a tag.
    Untagged,
    /// Only records carrying exactly this tag.
    Tagged(String),
}

impl TagFilter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            TagFilter::Any => true,
            TagFilter::Untagged => record.tag.is_none(),
            TagFilter::Tagged(tag) => record.tag.as_deref() == Some(tag.as_str()),
        }
    }
}

/// Ordered collection of records. Keys are unique within each tag scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Records {
    entries: Vec<Record>,
}

impl Records {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the decrypted plaintext. Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let entries = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(Record::from_line)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Serialize to LF-terminated lines, in store order.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for record in &self.entries {
            out.push_str(&record.to_line());
            out.push('\n');
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.entries.iter()
    }

    /// Keys in scope whose name contains `filter`, in store order.
    pub fn keys(&self, filter: Option<&str>, scope: &TagFilter) -> Vec<String> {
        let filter = filter.unwrap_or("");
        self.entries
            .iter()
            .filter(|r| scope.matches(r) && r.key.contains(filter))
            .map(|r| r.key.clone())
            .collect()
    }

    pub fn get(&self, key: &str, tag: Option<&str>) -> Option<&Record> {
        self.entries
            .iter()
            .find(|r| r.key == key && r.in_scope(tag))
    }

    /// Value for exactly `(key, tag)`, or `NotFound`.
    pub fn value_of(&self, key: &str, tag: Option<&str>) -> Result<String, StoreError> {
        self.get(key, tag)
            .map(|r| r.value.clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
                tag: normalize_tag(tag).map(str::to_string),
            })
    }

    /// Replace the value of an existing `(key, tag)` in place, or append.
    pub fn upsert(&mut self, record: Record) {
        let tag = record.tag.clone();
        match self
            .entries
            .iter_mut()
            .find(|r| r.key == record.key && r.in_scope(tag.as_deref()))
        {
            Some(existing) => existing.value = record.value,
            None => self.entries.push(record),
        }
    }

    /// Remove the first record with this key, whatever its tag.
    pub fn remove(&mut self, key: &str) -> Option<Record> {
        let idx = self.entries.iter().position(|r| r.key == key)?;
        Some(self.entries.remove(idx))
    }

    /// `key=value` lines for records in scope, tags stripped.
    pub fn dump(&self, scope: &TagFilter) -> String {
        self.entries
            .iter()
            .filter(|r| scope.matches(r))
            .map(|r| format!("{}={}", r.key, r.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn normalize_tag(tag: Option<&str>) -> Option<&str> {
    tag.filter(|t| !t.is_empty())
}

fn has_line_break_or_separator(s: &str) -> bool {
    s.contains(['\n', '\r', TAG_SEPARATOR])
}

fn invalid(reason: &str) -> StoreError {
    StoreError::InvalidRecord {
        reason: reason.to_string(),
    }
}
