// Read-only clients for the RuneMetrics profile and Hiscores skill-table APIs.
//
// Every failure is folded into `Lookup`; nothing here returns an error to the
// command layer.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::metrics;

/// Skill rows of the index_lite response, in order.
pub const SKILLS: [&str; 30] = [
    "Overall",
    "Attack",
    "Defence",
    "Strength",
    "Constitution",
    "Ranged",
    "Prayer",
    "Magic",
    "Cooking",
    "Woodcutting",
    "Fletching",
    "Fishing",
    "Firemaking",
    "Crafting",
    "Smithing",
    "Mining",
    "Herblore",
    "Agility",
    "Thieving",
    "Slayer",
    "Farming",
    "Runecrafting",
    "Hunter",
    "Construction",
    "Summoning",
    "Dungeoneering",
    "Divination",
    "Invention",
    "Archaeology",
    "Necromancy",
];

/// Recent activities requested from RuneMetrics.
pub const ACTIVITY_COUNT: u32 = 20;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Http(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Malformed(e.to_string())
        } else {
            UpstreamError::Http(e)
        }
    }
}

/// Outcome of a single upstream lookup.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    /// The provider answered and has no such player.
    NotFound,
    /// Network failure, timeout, or an unusable response.
    Unavailable(UpstreamError),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound | Lookup::Unavailable(_) => None,
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            Lookup::Found(_) => "found",
            Lookup::NotFound => "not_found",
            Lookup::Unavailable(_) => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    RuneMetrics,
    Hiscores,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::RuneMetrics => "runemetrics",
            Provider::Hiscores => "hiscores",
        }
    }
}

// ── Response shapes ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// RuneMetrics profile. Every field the provider may omit is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "totalxp")]
    pub total_xp: Option<i64>,
    #[serde(default, rename = "totalskill")]
    pub total_skill: Option<i64>,
    #[serde(default, rename = "combatlevel")]
    pub combat_level: Option<i64>,
    #[serde(default, rename = "questscomplete")]
    pub quests_complete: Option<i64>,
    #[serde(default, rename = "questsstarted")]
    pub quests_started: Option<i64>,
    #[serde(default, rename = "questsnotstarted")]
    pub quests_not_started: Option<i64>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    profile: Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkillStats {
    pub rank: i64,
    pub level: i64,
    pub xp: i64,
}

/// Hiscores skill table keyed by skill name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillTable {
    skills: HashMap<&'static str, SkillStats>,
}

impl SkillTable {
    pub fn get(&self, skill: &str) -> Option<&SkillStats> {
        self.skills.get(skill)
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Parse an index_lite body. Line `i` belongs to `SKILLS[i]`; lines with
/// fewer than three fields are skipped and lines past the skill list ignored.
pub fn parse_skill_table(body: &str) -> Result<SkillTable, UpstreamError> {
    let mut skills = HashMap::new();
    for (skill, line) in SKILLS.iter().zip(body.trim().lines()) {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 3 {
            continue;
        }
        let field = |i: usize| {
            parts[i]
                .trim()
                .parse::<i64>()
                .map_err(|e| UpstreamError::Malformed(format!("{skill} field {i}: {e}")))
        };
        skills.insert(
            *skill,
            SkillStats {
                rank: field(0)?,
                level: field(1)?,
                xp: field(2)?,
            },
        );
    }
    Ok(SkillTable { skills })
}

// ── Client ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    runemetrics_url: String,
    hiscores_url: String,
}

impl UpstreamClient {
    pub fn new(runemetrics_url: &str, hiscores_url: &str) -> Result<Self, reqwest::Error> {
        Self::with_timeout(runemetrics_url, hiscores_url, UPSTREAM_TIMEOUT)
    }

    /// Like `new`, with a per-request timeout other than `UPSTREAM_TIMEOUT`.
    pub fn with_timeout(
        runemetrics_url: &str,
        hiscores_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            runemetrics_url: runemetrics_url.to_string(),
            hiscores_url: hiscores_url.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.runemetrics_url, &config.hiscores_url)
    }

    /// Fetch a RuneMetrics profile with the most recent activities.
    ///
    /// The name is sent form-encoded in the query string, so spaces go out
    /// as `+` rather than `%20`. Both providers accept either.
    pub async fn fetch_profile(&self, rsn: &str) -> Lookup<Profile> {
        let started = Instant::now();
        let lookup = match self.request_profile(rsn).await {
            Ok(Some(profile)) => Lookup::Found(profile),
            Ok(None) => Lookup::NotFound,
            Err(e) => Lookup::Unavailable(e),
        };
        record(Provider::RuneMetrics, rsn, &lookup, started);
        lookup
    }

    /// Fetch the Hiscores skill table.
    pub async fn fetch_skills(&self, rsn: &str) -> Lookup<SkillTable> {
        let started = Instant::now();
        let lookup = match self.request_skills(rsn).await {
            Ok(Some(table)) => Lookup::Found(table),
            Ok(None) => Lookup::NotFound,
            Err(e) => Lookup::Unavailable(e),
        };
        record(Provider::Hiscores, rsn, &lookup, started);
        lookup
    }

    async fn request_profile(&self, rsn: &str) -> Result<Option<Profile>, UpstreamError> {
        let activities = ACTIVITY_COUNT.to_string();
        let resp = self
            .http
            .get(&self.runemetrics_url)
            .query(&[("user", rsn), ("activities", activities.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status != reqwest::StatusCode::OK {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        let parsed: ProfileResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        // An empty object or an error marker means there is no such profile
        if parsed.error.is_some() || parsed.profile.name.is_none() {
            return Ok(None);
        }
        Ok(Some(parsed.profile))
    }

    async fn request_skills(&self, rsn: &str) -> Result<Option<SkillTable>, UpstreamError> {
        let resp = self
            .http
            .get(&self.hiscores_url)
            .query(&[("player", rsn)])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status != reqwest::StatusCode::OK {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        let table = parse_skill_table(&body)?;
        Ok((!table.is_empty()).then_some(table))
    }
}

fn record<T>(provider: Provider, rsn: &str, lookup: &Lookup<T>, started: Instant) {
    metrics::UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&[provider.as_str()])
        .observe(started.elapsed().as_secs_f64());
    metrics::UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&[provider.as_str(), lookup.outcome_label()])
        .inc();

    match lookup {
        Lookup::Found(_) => {}
        Lookup::NotFound => tracing::debug!("{} has no player {rsn}", provider.as_str()),
        Lookup::Unavailable(e) => tracing::warn!("{} error for {rsn}: {e}", provider.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lite_line(rank: i64, level: i64, xp: i64) -> String {
        format!("{rank},{level},{xp}")
    }

    #[test]
    fn test_parse_full_table() {
        let body: Vec<String> = (0..SKILLS.len() as i64)
            .map(|i| lite_line(100 + i, 99, 13_034_431 + i))
            .collect();
        let table = parse_skill_table(&body.join("\n")).unwrap();

        assert!(SKILLS.iter().all(|skill| table.get(skill).is_some()));
        assert_eq!(
            table.get("Overall"),
            Some(&SkillStats {
                rank: 100,
                level: 99,
                xp: 13_034_431
            })
        );
        assert_eq!(table.get("Necromancy").unwrap().rank, 129);
    }

    #[test]
    fn test_parse_skips_short_lines_and_ignores_extra_rows() {
        let mut lines = vec![
            lite_line(1, 2898, 5_600_000_000),
            "garbage".to_string(),
            lite_line(5, 99, 200_000_000),
        ];
        // Activity/minigame rows follow the skills and have only two fields
        for _ in 3..SKILLS.len() {
            lines.push(lite_line(-1, 1, 0));
        }
        lines.push("-1,-1".to_string());
        lines.push("7,8".to_string());

        let table = parse_skill_table(&lines.join("\n")).unwrap();
        let present = SKILLS.iter().filter(|skill| table.get(skill).is_some()).count();
        assert_eq!(present, 29);
        assert!(table.get("Attack").is_none());
        assert_eq!(table.get("Defence").unwrap().level, 99);
    }

    #[test]
    fn test_parse_uses_first_three_fields() {
        let table = parse_skill_table("12,2500,400000000,extra\n").unwrap();
        assert_eq!(
            table.get("Overall"),
            Some(&SkillStats {
                rank: 12,
                level: 2500,
                xp: 400_000_000
            })
        );
    }

    #[test]
    fn test_parse_without_skill_rows_is_empty() {
        assert!(parse_skill_table("").unwrap().is_empty());
        assert!(parse_skill_table("-1,-1\n-1,-1\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_non_numeric_is_malformed() {
        let err = parse_skill_table("1,abc,3").unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[test]
    fn test_profile_fields_are_optional() {
        let parsed: ProfileResponse = serde_json::from_str(r#"{"name":"Zezima","totalxp":1234}"#).unwrap();
        assert!(parsed.error.is_none());
        assert_eq!(parsed.profile.name.as_deref(), Some("Zezima"));
        assert_eq!(parsed.profile.total_xp, Some(1234));
        assert_eq!(parsed.profile.combat_level, None);
        assert!(parsed.profile.activities.is_empty());
    }

    #[test]
    fn test_profile_error_field() {
        let parsed: ProfileResponse =
            serde_json::from_str(r#"{"error":"NO_PROFILE","loggedIn":"false"}"#).unwrap();
        assert_eq!(parsed.error.as_deref(), Some("NO_PROFILE"));
    }

    #[test]
    fn test_lookup_found() {
        let found: Lookup<i32> = Lookup::Found(3);
        assert_eq!(found.found(), Some(3));

        let missing: Lookup<i32> = Lookup::NotFound;
        assert_eq!(missing.found(), None);

        let down: Lookup<i32> = Lookup::Unavailable(UpstreamError::Timeout);
        assert_eq!(down.found(), None);
    }
}
