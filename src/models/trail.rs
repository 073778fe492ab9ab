use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{Category, CategoryRecord, PgQuery};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Trail {
    pub url: String,
    pub name: String,
    pub location: String,
    pub length: f64,
    pub condition_date: String,
    pub condition_time: String,
    pub conditions: Option<String>,
    pub stars: f64,
    pub star_votes: i64,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrailResult {
    url: String,
    name: String,
    location: String,
    length: f64,
    condition_date: String,
    condition_details: Option<String>,
    stars: f64,
    star_votes: i64,
    summary: String,
}

/// Splits `"2018-07-21 20:58:20"` into its date and time halves.
fn split_condition_date(raw: &str) -> (String, String) {
    match raw.split_once(' ') {
        Some((date, time)) => (date.to_string(), time.to_string()),
        None => (raw.to_string(), String::new()),
    }
}

impl CategoryRecord for Trail {
    const CATEGORY: Category = Category::Trails;
    const COLUMNS: &'static [&'static str] = &[
        "url",
        "name",
        "location",
        "length",
        "condition_date",
        "condition_time",
        "conditions",
        "stars",
        "star_votes",
        "summary",
    ];

    fn from_upstream(raw: Value) -> Result<Self> {
        let trail: TrailResult = serde_json::from_value(raw)?;
        let (condition_date, condition_time) = split_condition_date(&trail.condition_date);

        Ok(Self {
            url: trail.url,
            name: trail.name,
            location: trail.location,
            length: trail.length,
            condition_date,
            condition_time,
            conditions: trail.condition_details,
            stars: trail.stars,
            star_votes: trail.star_votes,
            summary: trail.summary,
        })
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.url)
            .bind(&self.name)
            .bind(&self.location)
            .bind(self.length)
            .bind(&self.condition_date)
            .bind(&self.condition_time)
            .bind(&self.conditions)
            .bind(self.stars)
            .bind(self.star_votes)
            .bind(&self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_result() {
        let payload = r#"
        {
            "id": 7011192,
            "name": "Rattlesnake Ledge",
            "type": "Featured Hike",
            "summary": "A popular hike to a viewpoint above Rattlesnake Lake.",
            "difficulty": "blue",
            "stars": 4.4,
            "starVotes": 82,
            "location": "North Bend, Washington",
            "url": "https://www.hikingproject.com/trail/7011192/rattlesnake-ledge",
            "length": 4.3,
            "conditionStatus": "All Clear",
            "conditionDetails": "Dry",
            "conditionDate": "2018-07-21 20:58:20"
        }
        "#;

        let trail = Trail::from_upstream(serde_json::from_str(payload).unwrap()).unwrap();
        assert_eq!(trail.name, "Rattlesnake Ledge");
        assert_eq!(trail.condition_date, "2018-07-21");
        assert_eq!(trail.condition_time, "20:58:20");
        assert_eq!(trail.conditions.as_deref(), Some("Dry"));
        assert_eq!(trail.star_votes, 82);
    }

    #[test]
    fn test_condition_date_without_time() {
        assert_eq!(
            split_condition_date("1970-01-01"),
            ("1970-01-01".to_string(), String::new())
        );
    }
}
