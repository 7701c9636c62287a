//! Records passed between the pipeline stages.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::documents::SearchDocument;
use crate::watermark::Watermark;

/// A validated aggregate row produced by the extractor.
///
/// Exists only within one pipeline pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    /// Source identity of the aggregate root.
    pub id: Uuid,
    /// Normalized document body.
    pub body: Value,
    /// Modification timestamp of the source row.
    pub modified_at: Watermark,
}

impl ExtractedRecord {
    /// Build a record from a typed document.
    pub fn from_document<D: SearchDocument>(
        document: &D,
        modified_at: Watermark,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: document.id(),
            body: serde_json::to_value(document)?,
            modified_at,
        })
    }

    /// The index-ready form of this record.
    pub fn to_document(&self) -> IndexDocument {
        IndexDocument {
            id: self.id.to_string(),
            body: self.body.clone(),
        }
    }
}

/// A document ready to be upserted into the search index.
///
/// `id` equals the source identity so reloading overwrites instead of
/// duplicating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
    pub id: String,
    pub body: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::GenreDocument;

    #[test]
    fn test_document_identity_matches_source() {
        let genre = GenreDocument {
            id: Uuid::new_v4(),
            name: "Drama".to_string(),
            description: None,
        };

        let record = ExtractedRecord::from_document(&genre, Watermark::earliest()).unwrap();
        let document = record.to_document();

        assert_eq!(document.id, genre.id.to_string());
        assert_eq!(document.body["name"], "Drama");
    }
}
