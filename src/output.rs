//! Request and result types exchanged with transport adapters.
//!
//! The wire shapes are fixed: a request is `{"blobPath": "<key>"}` and a
//! result is a JSON array of `{"filepath": "<uri>"}`, one per page, in page
//! order.

use serde::{Deserialize, Serialize};

/// Inbound request naming the document to split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRequest {
    /// Key of the document within the source namespace.
    #[serde(rename = "blobPath", alias = "BlobPath", alias = "blob_path", default)]
    pub blob_path: String,
}

impl SplitRequest {
    pub fn new(blob_path: impl Into<String>) -> Self {
        Self {
            blob_path: blob_path.into(),
        }
    }
}

/// Durable identity of one stored page image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputLocation {
    /// URI or path of the stored artifact, as reported by the store.
    pub filepath: String,
}

impl OutputLocation {
    pub fn new(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.filepath
    }
}

/// Locations of every page image, ordered by ascending page number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitResult {
    locations: Vec<OutputLocation>,
}

impl SplitResult {
    pub(crate) fn with_capacity(pages: usize) -> Self {
        Self {
            locations: Vec::with_capacity(pages),
        }
    }

    pub(crate) fn push(&mut self, location: OutputLocation) {
        self.locations.push(location);
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn locations(&self) -> &[OutputLocation] {
        &self.locations
    }

    /// Location of page `page_num` (1-indexed).
    pub fn page(&self, page_num: usize) -> Option<&OutputLocation> {
        page_num
            .checked_sub(1)
            .and_then(|idx| self.locations.get(idx))
    }

    pub fn into_locations(self) -> Vec<OutputLocation> {
        self.locations
    }
}

impl IntoIterator for SplitResult {
    type Item = OutputLocation;
    type IntoIter = std::vec::IntoIter<OutputLocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.locations.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_both_casings() {
        let a: SplitRequest = serde_json::from_str(r#"{"blobPath":"a/b.pdf"}"#).unwrap();
        let b: SplitRequest = serde_json::from_str(r#"{"BlobPath":"a/b.pdf"}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.blob_path, "a/b.pdf");
    }

    #[test]
    fn request_without_path_deserialises_empty() {
        let r: SplitRequest = serde_json::from_str("{}").unwrap();
        assert!(r.blob_path.is_empty());
    }

    #[test]
    fn result_serialises_as_array_of_filepaths() {
        let mut result = SplitResult::with_capacity(2);
        result.push(OutputLocation::new("memory://output/x-001.jpg"));
        result.push(OutputLocation::new("memory://output/x-002.jpg"));

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"[{"filepath":"memory://output/x-001.jpg"},{"filepath":"memory://output/x-002.jpg"}]"#
        );
    }

    #[test]
    fn empty_result_serialises_as_empty_array() {
        let json = serde_json::to_string(&SplitResult::default()).unwrap();
        assert_eq!(json, "[]");
    }

    #[test]
    fn page_lookup_is_one_based() {
        let mut result = SplitResult::default();
        result.push(OutputLocation::new("p1"));
        result.push(OutputLocation::new("p2"));
        assert_eq!(result.page(1).map(|l| l.as_str()), Some("p1"));
        assert_eq!(result.page(2).map(|l| l.as_str()), Some("p2"));
        assert!(result.page(0).is_none());
        assert!(result.page(3).is_none());
    }
}
