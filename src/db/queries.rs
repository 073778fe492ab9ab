use crate::models::Category;

pub const SELECT_LOCATION_BY_QUERY: &str = r#"
SELECT id, search_query, formatted_query, latitude, longitude, created_at
FROM locations WHERE search_query = $1;
"#;

// A concurrent insert of the same query keeps the first row.
pub const INSERT_LOCATION: &str = r#"
INSERT INTO locations (id, search_query, formatted_query, latitude, longitude, created_at)
VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (search_query) DO UPDATE SET search_query = EXCLUDED.search_query
RETURNING id, search_query, formatted_query, latitude, longitude, created_at;
"#;

pub fn select_records(category: Category) -> String {
    format!(
        "SELECT * FROM {} WHERE location_id = $1 ORDER BY id;",
        category.table()
    )
}

/// `$1` is the location id, `$2` the creation time, then one placeholder
/// per category column.
pub fn insert_record(category: Category, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (3..columns.len() + 3).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} (location_id, created_at, {}) VALUES ($1, $2, {}) RETURNING *;",
        category.table(),
        columns.join(", "),
        placeholders.join(", ")
    )
}

pub fn delete_records(category: Category) -> String {
    format!("DELETE FROM {} WHERE location_id = $1;", category.table())
}
