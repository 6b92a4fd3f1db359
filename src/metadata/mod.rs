pub mod probe;
pub mod report;

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffprobe exited with {status}: {stderr}")]
    ProbeFailed { status: String, stderr: String },
    #[error("unreadable ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no metadata could be extracted from the file")]
    Empty,
}

/// A single metadata value, kept typed so that distractors can be generated
/// from the real shape of the value instead of guessing from its text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(u64),
    Dimensions { width: u32, height: u32 },
    Decimal(f64),
    Text(String),
}

impl FieldValue {
    /// Guesses the shape of an already rendered value.
    /// Checked in order: pure integer, "WxH", decimal, text.
    pub fn infer(raw: &str) -> Self {
        let raw = raw.trim();

        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<u64>() {
                return FieldValue::Integer(n);
            }
        }

        if let Some((w, h)) = raw.split_once('x') {
            if let (Ok(width), Ok(height)) = (w.parse::<u32>(), h.parse::<u32>()) {
                return FieldValue::Dimensions { width, height };
            }
        }

        if raw.contains('.') {
            if let Ok(f) = raw.parse::<f64>() {
                if f.is_finite() {
                    return FieldValue::Decimal(f);
                }
            }
        }

        FieldValue::Text(raw.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Dimensions { width, height } => write!(f, "{}x{}", width, height),
            FieldValue::Decimal(d) => write!(f, "{:.2}", d),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered field name -> value mapping describing one analyzed file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    fields: Vec<(String, FieldValue)>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing the value in place if the name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub(crate) fn field_at(&self, idx: usize) -> Option<(&str, &FieldValue)> {
        self.fields.get(idx).map(|(n, v)| (n.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        let mut record = MetadataRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}
