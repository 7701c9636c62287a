//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for each synchronized
//! entity type. Mappings are `strict`, so a document whose shape drifts from
//! the mapping is rejected by the bulk API instead of silently widening it.

use serde_json::{json, Value};

/// Analysis settings shared by every index.
///
/// The `ru_en` analyzer stems both English and Russian text, matching the
/// catalogue content.
fn analysis_settings() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": {"type": "stop", "stopwords": "_english_"},
                "english_stemmer": {"type": "stemmer", "language": "english"},
                "english_possessive_stemmer": {"type": "stemmer", "language": "possessive_english"},
                "russian_stop": {"type": "stop", "stopwords": "_russian_"},
                "russian_stemmer": {"type": "stemmer", "language": "russian"}
            },
            "analyzer": {
                "ru_en": {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

/// Nested `{id, name}` person reference.
fn person_ref_mapping() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": {"type": "keyword"},
            "name": {"type": "text", "analyzer": "ru_en"}
        }
    })
}

/// Settings and mappings for the `movies` index.
pub fn movies_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "imdb_rating": {"type": "float"},
                "genre": {"type": "keyword"},
                "title": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text", "analyzer": "ru_en"},
                "director": {"type": "text", "analyzer": "ru_en"},
                "directors": person_ref_mapping(),
                "actors_names": {"type": "text", "analyzer": "ru_en"},
                "writers_names": {"type": "text", "analyzer": "ru_en"},
                "actors": person_ref_mapping(),
                "writers": person_ref_mapping()
            }
        }
    })
}

/// Settings and mappings for the `genres` index.
pub fn genres_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text", "analyzer": "ru_en"}
            }
        }
    })
}

/// Settings and mappings for the `persons` index.
pub fn persons_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "full_name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "films": {
                    "type": "nested",
                    "dynamic": "strict",
                    "properties": {
                        "id": {"type": "keyword"},
                        "roles": {"type": "keyword"}
                    }
                }
            }
        }
    })
}
