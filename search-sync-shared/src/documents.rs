//! Document shapes for the synchronized entity types.
//!
//! Each shape mirrors one aggregate row of the relational source. Rows are
//! deserialized into these structs, which is where a source/document mismatch
//! is detected, and then serialized back into the index body.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document shape that can be written to the search index.
pub trait SearchDocument: Serialize + DeserializeOwned {
    /// Identity of the source row, reused as the index document id.
    fn id(&self) -> Uuid;
}

/// Reference to a person taking part in a film work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

/// A film work with genres and people grouped by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmWorkDocument {
    pub id: Uuid,
    pub imdb_rating: Option<f64>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub director: Vec<String>,
    #[serde(default)]
    pub directors: Vec<PersonRef>,
    #[serde(default)]
    pub actors_names: Vec<String>,
    #[serde(default)]
    pub writers_names: Vec<String>,
    #[serde(default)]
    pub actors: Vec<PersonRef>,
    #[serde(default)]
    pub writers: Vec<PersonRef>,
}

impl SearchDocument for FilmWorkDocument {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// A genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl SearchDocument for GenreDocument {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Participation of a person in one film work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFilm {
    pub id: Uuid,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A person with the film works they took part in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub films: Vec<PersonFilm>,
}

impl SearchDocument for PersonDocument {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_film_work_directors_carry_ids() {
        let doc: FilmWorkDocument = serde_json::from_value(json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "title": "Solaris",
            "imdb_rating": null,
            "description": null,
            "director": ["Andrei Tarkovsky"],
            "directors": [
                {"id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8", "name": "Andrei Tarkovsky"}
            ]
        }))
        .unwrap();

        assert_eq!(doc.director, vec!["Andrei Tarkovsky"]);
        assert_eq!(doc.directors.len(), 1);
        assert_eq!(doc.directors[0].name, "Andrei Tarkovsky");
        assert_eq!(
            doc.directors[0].id.to_string(),
            "6ba7b810-9dad-11d1-80b4-00c04fd430c8"
        );
    }

    #[test]
    fn test_film_work_missing_arrays_default_to_empty() {
        let doc: FilmWorkDocument = serde_json::from_value(json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "title": "Solaris",
            "imdb_rating": 8.1,
            "description": null
        }))
        .unwrap();

        assert_eq!(doc.title, "Solaris");
        assert!(doc.genre.is_empty());
        assert!(doc.actors.is_empty());
        assert!(doc.directors.is_empty());
        assert_eq!(
            doc.id().to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_film_work_requires_title() {
        let result: Result<FilmWorkDocument, _> = serde_json::from_value(json!({
            "id": "550e8400-e29b-41d4-a716-446655440000"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_person_roles_grouped_per_film() {
        let doc: PersonDocument = serde_json::from_value(json!({
            "id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "full_name": "Andrei Tarkovsky",
            "films": [
                {"id": "550e8400-e29b-41d4-a716-446655440000", "roles": ["director", "writer"]}
            ]
        }))
        .unwrap();

        assert_eq!(doc.films.len(), 1);
        assert_eq!(doc.films[0].roles, vec!["director", "writer"]);
    }
}
