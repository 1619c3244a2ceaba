//! Job listing records
//!
//! A [`JobListing`] is one scraped posting; a [`StoredJob`] is the same record
//! read back from the `jobs` table with its row id.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp format used in the `jobs` table and the JSON dump
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format used for `deadline`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One scraped job posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub job_group: String,
    pub badge: Option<String>,
    pub company_name: Option<String>,
    pub title: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub address_main: Option<String>,
    pub address_total: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub employment_type: Option<String>,
    pub salary: Option<String>,
    /// Comma-joined tag list; `None` when the card has no tag container
    pub tech_stack: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub crawled_at: NaiveDateTime,
    /// Canonical detail URL, the natural key
    pub url: Option<String>,
    pub description: String,
}

impl JobListing {
    /// Short label for log lines
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("<untitled>")
    }
}

/// A listing as stored, with its primary key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredJob {
    pub id: i64,
    #[serde(flatten)]
    pub listing: JobListing,
}

/// Compact listing used for related-job suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: i64,
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub address_main: Option<String>,
}

/// Newest-listing notification entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentJob {
    pub id: i64,
    pub title: Option<String>,
    pub company_name: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
