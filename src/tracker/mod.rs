//! Issue tracker access.
//!
//! The pipeline depends only on [`TicketSource`]; concrete sources are a
//! Jira REST client and a local JSON file (useful for offline runs and
//! fixtures). Both produce tickets with raw dates and reported affected
//! versions; lifecycle resolution happens elsewhere.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::{Error, Result, Ticket};

/// Yields the closed, fixed bug tickets of one project.
pub trait TicketSource {
    fn fetch_tickets(&self) -> Result<Vec<Ticket>>;
}

/// Parse a tracker date. Jira emits `2023-04-01T10:20:30.000+0000`; plain
/// RFC 3339 is accepted too. Unparsable dates become `None`, which excludes
/// the ticket from lifecycle resolution without dropping it.
pub fn parse_tracker_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[derive(Debug, Deserialize)]
struct RawTicket {
    key: String,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    resolved: Option<String>,
    #[serde(default)]
    affected_versions: Vec<String>,
}

impl From<RawTicket> for Ticket {
    fn from(raw: RawTicket) -> Self {
        Ticket::new(
            raw.key,
            raw.created.as_deref().and_then(parse_tracker_date),
            raw.resolved.as_deref().and_then(parse_tracker_date),
        )
        .with_affected_versions(raw.affected_versions)
    }
}

/// Tickets stored as a JSON array on disk.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TicketSource for JsonFileSource {
    fn fetch_tickets(&self) -> Result<Vec<Ticket>> {
        let file = File::open(&self.path)?;
        let raw: Vec<RawTicket> = serde_json::from_reader(BufReader::new(file))?;
        Ok(raw.into_iter().map(Ticket::from).collect())
    }
}

/// Jira REST client for closed, fixed bug tickets of one project.
pub struct JiraClient {
    base_url: String,
    project_key: String,
    client: reqwest::blocking::Client,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
struct JiraSearchPage {
    total: usize,
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraFields,
}

#[derive(Debug, Deserialize)]
struct JiraFields {
    #[serde(default)]
    created: Option<String>,
    #[serde(default, rename = "resolutiondate")]
    resolution_date: Option<String>,
    #[serde(default)]
    versions: Vec<JiraVersion>,
}

#[derive(Debug, Deserialize)]
struct JiraVersion {
    name: String,
}

impl JiraClient {
    pub fn new(base_url: impl Into<String>, project_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            project_key: project_key.into(),
            client: reqwest::blocking::Client::new(),
            page_size: 100,
        }
    }

    fn jql(&self) -> String {
        format!(
            "project = {} AND issueType = Bug AND status in (Resolved, Closed) \
             AND resolution = Fixed ORDER BY created ASC",
            self.project_key
        )
    }

    fn fetch_page(&self, start_at: usize) -> Result<JiraSearchPage> {
        let url = format!("{}/rest/api/2/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("jql", self.jql().as_str()),
                ("fields", "key,created,resolutiondate,versions"),
                ("startAt", &start_at.to_string()),
                ("maxResults", &self.page_size.to_string()),
            ])
            .send()
            .map_err(|e| Error::tracker(format!("jira request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::tracker(format!(
                "jira returned {} for startAt={start_at}",
                response.status()
            )));
        }
        response
            .json()
            .map_err(|e| Error::tracker(format!("malformed jira response: {e}")))
    }
}

impl TicketSource for JiraClient {
    fn fetch_tickets(&self) -> Result<Vec<Ticket>> {
        let mut tickets = Vec::new();
        let mut start_at = 0;
        loop {
            let page = self.fetch_page(start_at)?;
            let fetched = page.issues.len();
            for issue in page.issues {
                tickets.push(
                    Ticket::new(
                        issue.key,
                        issue.fields.created.as_deref().and_then(parse_tracker_date),
                        issue
                            .fields
                            .resolution_date
                            .as_deref()
                            .and_then(parse_tracker_date),
                    )
                    .with_affected_versions(
                        issue.fields.versions.into_iter().map(|v| v.name).collect(),
                    ),
                );
            }
            start_at += fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }
        tracing::info!(
            "fetched {} fixed bug tickets for {}",
            tickets.len(),
            self.project_key
        );
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_jira_date_format() {
        let parsed = parse_tracker_date("2023-04-01T10:20:30.000+0000").unwrap();
        assert_eq!(parsed.timestamp(), 1680344430);
    }

    #[test]
    fn test_parse_rfc3339_fallback() {
        assert!(parse_tracker_date("2023-04-01T10:20:30Z").is_some());
        assert!(parse_tracker_date("not a date").is_none());
        assert!(parse_tracker_date("").is_none());
    }

    #[test]
    fn test_json_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"key": "PROJ-1", "created": "2023-01-02T00:00:00Z",
                  "resolved": "2023-01-05T00:00:00Z",
                  "affected_versions": ["0.1.0"]}},
                {{"key": "PROJ-2", "created": "garbage"}}
            ]"#
        )
        .unwrap();

        let tickets = JsonFileSource::new(file.path()).fetch_tickets().unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].key, "PROJ-1");
        assert!(tickets[0].created.is_some());
        assert_eq!(tickets[0].affected_versions, vec!["0.1.0"]);
        // Unparsable date degrades to None, the ticket survives.
        assert!(tickets[1].created.is_none());
        assert!(tickets[1].resolved.is_none());
        assert!(tickets[1].affected_versions.is_empty());
    }

    #[test]
    fn test_jql_shape() {
        let client = JiraClient::new("https://issues.apache.org/jira", "BOOKKEEPER");
        let jql = client.jql();
        assert!(jql.contains("project = BOOKKEEPER"));
        assert!(jql.contains("resolution = Fixed"));
    }
}
