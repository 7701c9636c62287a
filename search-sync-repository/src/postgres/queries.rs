//! Aggregation queries for each synchronized entity type.
//!
//! Every query:
//! - takes the exclusive lower bound on `updated_at` as `$1`
//! - returns a `document` JSON column and a `modified` timestamp column
//! - is ordered ascending by `modified`
//!
//! The aggregate is built in a subquery and rendered with `to_jsonb`, so the
//! JSON keys are exactly the subquery's column names.

/// Film works with genres and people partitioned by role.
pub const FILM_WORKS: &str = r#"
SELECT to_jsonb(agg) - 'modified' AS document, agg.modified
FROM (
    SELECT
        fw.id,
        fw.title,
        fw.description,
        fw.rating AS imdb_rating,
        COALESCE(
            json_agg(DISTINCT p.full_name)
                FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'director'),
            '[]'
        ) AS director,
        COALESCE(
            json_agg(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name))
                FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'director'),
            '[]'
        ) AS directors,
        COALESCE(
            json_agg(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name))
                FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'actor'),
            '[]'
        ) AS actors,
        COALESCE(
            json_agg(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name))
                FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'writer'),
            '[]'
        ) AS writers,
        COALESCE(
            json_agg(DISTINCT p.full_name)
                FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'actor'),
            '[]'
        ) AS actors_names,
        COALESCE(
            json_agg(DISTINCT p.full_name)
                FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'writer'),
            '[]'
        ) AS writers_names,
        COALESCE(
            json_agg(DISTINCT g.name) FILTER (WHERE g.id IS NOT NULL),
            '[]'
        ) AS genre,
        fw.updated_at AS modified
    FROM content.film_work fw
    LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
    LEFT JOIN content.person p ON p.id = pfw.person_id
    LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
    LEFT JOIN content.genre g ON g.id = gfw.genre_id
    WHERE fw.updated_at > $1
    GROUP BY fw.id
) agg
ORDER BY agg.modified ASC
"#;

/// Genres.
pub const GENRES: &str = r#"
SELECT to_jsonb(agg) - 'modified' AS document, agg.modified
FROM (
    SELECT
        g.id,
        g.name,
        g.description,
        g.updated_at AS modified
    FROM content.genre g
    WHERE g.updated_at > $1
) agg
ORDER BY agg.modified ASC
"#;

/// People with the roles they hold in each film work.
pub const PERSONS: &str = r#"
SELECT to_jsonb(agg) - 'modified' AS document, agg.modified
FROM (
    SELECT
        p.id,
        p.full_name,
        COALESCE(
            json_agg(
                jsonb_build_object('id', roles.film_work_id, 'roles', roles.roles)
                ORDER BY roles.film_work_id
            ) FILTER (WHERE roles.film_work_id IS NOT NULL),
            '[]'
        ) AS films,
        p.updated_at AS modified
    FROM content.person p
    LEFT JOIN (
        SELECT
            pfw.person_id,
            pfw.film_work_id,
            array_agg(DISTINCT pfw.role ORDER BY pfw.role) AS roles
        FROM content.person_film_work pfw
        GROUP BY pfw.person_id, pfw.film_work_id
    ) roles ON roles.person_id = p.id
    WHERE p.updated_at > $1
    GROUP BY p.id
) agg
ORDER BY agg.modified ASC
"#;
