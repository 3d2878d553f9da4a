use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job posting as held by the corpus store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Stable job identity.
    pub id: Uuid,
    /// Job title as posted.
    pub title: String,
    /// Hiring company.
    pub company: String,
    /// Free-form location, if any.
    #[serde(default)]
    pub location: Option<String>,
    /// Whether the job can be done remotely.
    #[serde(default)]
    pub remote: bool,
    /// Posting body.
    #[serde(default)]
    pub description: String,
    /// Skill tags.
    #[serde(default)]
    pub skills: Vec<String>,
    /// When the job was posted.
    pub posted_at: DateTime<Utc>,
    /// Link to the original posting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Dense vector maintained by the store's vector index. Never sent to clients.
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

impl Job {
    /// Create a job with the required fields; everything else is empty.
    pub fn new(title: impl Into<String>, company: impl Into<String>, posted_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            company: company.into(),
            location: None,
            remote: false,
            description: String::new(),
            skills: Vec::new(),
            posted_at,
            url: None,
            embedding: None,
        }
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Mark the job remote or on-site.
    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Set the posting body.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the skill tags.
    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    /// Concatenated searchable text: title, company, skills, location, description.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.title, &self.company];
        parts.extend(self.skills.iter().map(String::as_str));
        if let Some(location) = &self.location {
            parts.push(location);
        }
        parts.push(&self.description);
        parts.join(" ")
    }
}
