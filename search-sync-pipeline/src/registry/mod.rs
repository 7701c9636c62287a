//! Entity type registry.
//!
//! Maps a symbolic entity type name to everything needed to sync it: the
//! aggregation query, the document shape rows are validated against and the
//! settings of the index the documents land in.

use std::collections::BTreeMap;

use search_sync_repository::opensearch::index_config;
use search_sync_repository::postgres::queries;
use search_sync_repository::AggregateRow;
use search_sync_shared::{
    ExtractedRecord, FilmWorkDocument, GenreDocument, PersonDocument, SearchDocument, Watermark,
};
use serde_json::Value;

use crate::errors::SyncError;

/// Validates an aggregate row and turns it into a record.
pub type ShapeFn = fn(&str, AggregateRow) -> Result<ExtractedRecord, SyncError>;

/// Everything needed to sync one entity type.
#[derive(Clone)]
pub struct EntityDefinition {
    /// Entity type name, also the index name.
    pub name: &'static str,
    /// Aggregation query taking the watermark as `$1`.
    pub sql: &'static str,
    /// Document shape.
    pub shape: ShapeFn,
    /// Index settings and mappings.
    pub index_settings: fn() -> Value,
}

impl EntityDefinition {
    /// Validate a row against this type's document shape.
    pub fn shape_row(&self, row: AggregateRow) -> Result<ExtractedRecord, SyncError> {
        (self.shape)(self.name, row)
    }
}

impl std::fmt::Debug for EntityDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Deserialize a row into `D`, rejecting rows that do not fit the shape.
pub fn shape_as<D: SearchDocument>(
    entity_type: &str,
    row: AggregateRow,
) -> Result<ExtractedRecord, SyncError> {
    let document: D = serde_json::from_value(row.document).map_err(|e| {
        SyncError::validation(format!("{} row does not match document shape: {}", entity_type, e))
    })?;

    ExtractedRecord::from_document(&document, Watermark::new(row.modified_at))
        .map_err(|e| SyncError::validation(format!("{} document: {}", entity_type, e)))
}

/// Lookup table from entity type name to its definition.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entries: BTreeMap<&'static str, EntityDefinition>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the film catalogue types: `movies`, `genres`, `persons`.
    pub fn catalog() -> Self {
        let mut registry = Self::new();
        registry.register(EntityDefinition {
            name: "movies",
            sql: queries::FILM_WORKS,
            shape: shape_as::<FilmWorkDocument>,
            index_settings: index_config::movies_index_settings,
        });
        registry.register(EntityDefinition {
            name: "genres",
            sql: queries::GENRES,
            shape: shape_as::<GenreDocument>,
            index_settings: index_config::genres_index_settings,
        });
        registry.register(EntityDefinition {
            name: "persons",
            sql: queries::PERSONS,
            shape: shape_as::<PersonDocument>,
            index_settings: index_config::persons_index_settings,
        });
        registry
    }

    /// Add or replace a definition.
    pub fn register(&mut self, definition: EntityDefinition) {
        self.entries.insert(definition.name, definition);
    }

    /// Resolve an entity type name.
    ///
    /// Unknown names are reported as [`SyncError::UnsupportedEntityType`].
    pub fn resolve(&self, entity_type: &str) -> Result<&EntityDefinition, SyncError> {
        self.entries
            .get(entity_type)
            .ok_or_else(|| SyncError::unsupported(entity_type))
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_catalog_resolves_known_types() {
        let registry = EntityRegistry::catalog();

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["genres", "movies", "persons"]
        );
        assert_eq!(registry.resolve("movies").unwrap().sql, queries::FILM_WORKS);
    }

    #[test]
    fn test_unknown_type_is_skippable() {
        let registry = EntityRegistry::catalog();

        let err = registry.resolve("cartoons").unwrap_err();
        assert!(err.is_skippable());
        assert_eq!(err.to_string(), "Unsupported entity type: cartoons");
    }

    #[test]
    fn test_shape_validates_and_normalizes() {
        let registry = EntityRegistry::catalog();
        let modified = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let row = AggregateRow::new(
            json!({
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "title": "Stalker",
                "imdb_rating": 8.0,
                "description": null,
                "director": ["Andrei Tarkovsky"]
            }),
            modified,
        );

        let record = registry.resolve("movies").unwrap().shape_row(row).unwrap();

        assert_eq!(record.id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(record.modified_at, Watermark::new(modified));
        assert_eq!(record.body["director"], json!(["Andrei Tarkovsky"]));
        assert_eq!(record.body["actors"], json!([]));
    }

    #[test]
    fn test_shape_rejects_mismatched_rows() {
        let registry = EntityRegistry::catalog();
        let row = AggregateRow::new(
            json!({"id": "not-a-uuid", "name": "Drama"}),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        );

        let err = registry.resolve("genres").unwrap().shape_row(row).unwrap_err();
        assert!(matches!(err, SyncError::ValidationError(_)));
    }
}
