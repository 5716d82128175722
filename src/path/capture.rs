//! Captured nodes, grouped per field

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::stack::PathElement;

/// A captured node: the path element as it was when it matched.
pub type CaptureEntry = PathElement;

/// Field name → captured entries in document order.
///
/// Every registered field is present, in registration order, even when
/// nothing matched it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStore {
    fields: Vec<(String, Vec<CaptureEntry>)>,
}

impl CaptureStore {
    /// Store with an empty sequence for each field
    pub fn with_fields<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            fields: names
                .into_iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
        }
    }

    /// Append `entry` to the field at `index` (registration order).
    pub(crate) fn push(&mut self, index: usize, entry: CaptureEntry) {
        if let Some((_, entries)) = self.fields.get_mut(index) {
            entries.push(entry);
        }
    }

    /// Entries of a registered field, `None` if the field was never registered
    pub fn get(&self, name: &str) -> Option<&[CaptureEntry]> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Entries of a field, empty if it has none or was never registered
    pub fn entries(&self, name: &str) -> &[CaptureEntry] {
        self.get(name).unwrap_or(&[])
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CaptureEntry])> {
        self.fields
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Number of registered fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total number of captured entries across all fields
    pub fn capture_count(&self) -> usize {
        self.fields.iter().map(|(_, entries)| entries.len()).sum()
    }
}

impl Serialize for CaptureStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, entries) in &self.fields {
            map.serialize_entry(name, entries)?;
        }
        map.end()
    }
}
