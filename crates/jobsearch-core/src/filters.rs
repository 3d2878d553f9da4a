use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::job::Job;

/// Posting-age window accepted by the `datePosted` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DatePosted {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl DatePosted {
    /// Earliest admissible posting time, or `None` when unconstrained.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DatePosted::Last24Hours => Some(now - Duration::hours(24)),
            DatePosted::Last7Days => Some(now - Duration::days(7)),
            DatePosted::Last30Days => Some(now - Duration::days(30)),
            DatePosted::All => None,
        }
    }
}

impl std::str::FromStr for DatePosted {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "24h" => Ok(DatePosted::Last24Hours),
            "7d" => Ok(DatePosted::Last7Days),
            "30d" => Ok(DatePosted::Last30Days),
            "all" | "" => Ok(DatePosted::All),
            other => Err(format!("unknown datePosted value '{other}'")),
        }
    }
}

/// Optional constraints applied identically by every layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Case-insensitive substring of the job location.
    #[serde(default)]
    pub location: Option<String>,
    /// Only remote jobs when true.
    #[serde(default)]
    pub remote_only: Option<bool>,
    /// Posting-age window.
    #[serde(default)]
    pub date_posted: Option<DatePosted>,
    /// Case-insensitive substring of the company.
    #[serde(default)]
    pub company: Option<String>,
    /// Case-insensitive substring of the title.
    #[serde(default)]
    pub title: Option<String>,
}

impl SearchFilters {
    /// True if no field constrains the result.
    pub fn is_empty(&self) -> bool {
        self.location.as_deref().map_or(true, |s| s.trim().is_empty())
            && !self.remote_only.unwrap_or(false)
            && self.date_posted.map_or(true, |d| d == DatePosted::All)
            && self.company.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.title.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    /// Check a job against every set field, evaluated at `now`.
    pub fn matches(&self, job: &Job, now: DateTime<Utc>) -> bool {
        if self.remote_only.unwrap_or(false) && !job.remote {
            return false;
        }
        if let Some(cutoff) = self.date_posted.and_then(|d| d.cutoff(now)) {
            if job.posted_at < cutoff {
                return false;
            }
        }
        if let Some(location) = non_blank(&self.location) {
            match &job.location {
                Some(job_location) if contains_ci(job_location, location) => {}
                _ => return false,
            }
        }
        if let Some(company) = non_blank(&self.company) {
            if !contains_ci(&job.company, company) {
                return false;
            }
        }
        if let Some(title) = non_blank(&self.title) {
            if !contains_ci(&job.title, title) {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
