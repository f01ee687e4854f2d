// Report building: turns upstream lookups and ledger rows into replies.
//
// Nothing in here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{AccountLink, DropEvent};
use crate::upstream::{Profile, SkillTable};

/// Skills shown in the combat summary, in display order.
pub const COMBAT_SKILLS: [&str; 9] = [
    "Attack",
    "Strength",
    "Defence",
    "Constitution",
    "Ranged",
    "Prayer",
    "Magic",
    "Summoning",
    "Necromancy",
];

pub const ACTIVITY_PREVIEW_CHARS: usize = 100;
pub const LEADERBOARD_SIZE: usize = 10;

const WINNER_MARK: &str = "🏆";
const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

/// Format an experience-like magnitude with a K/M/B suffix.
pub fn format_number(num: i64) -> String {
    if num >= 1_000_000_000 {
        format!("{:.2}B", num as f64 / 1_000_000_000.0)
    } else if num >= 1_000_000 {
        format!("{:.2}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

// ── Reply model ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
    /// Only the caller should see this reply.
    #[serde(default)]
    pub ephemeral: bool,
}

impl Reply {
    pub fn message(text: impl Into<String>) -> Self {
        Reply {
            content: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn ephemeral(text: impl Into<String>) -> Self {
        Reply {
            content: Some(text.into()),
            embed: None,
            ephemeral: true,
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Reply {
            embed: Some(embed),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Embed {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Look up a field value by name.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

// ── Single player ────────────────────────────────────────────────────

/// Normalized view of one player, merged from both providers for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub display_name: String,
    pub total_xp: Option<i64>,
    pub total_level: Option<i64>,
    pub combat_level: Option<i64>,
    pub quests_complete: Option<i64>,
    pub quests_started: Option<i64>,
    pub quests_not_started: Option<i64>,
    pub recent_activity: Option<String>,
    pub skills: Option<SkillTable>,
}

impl PlayerSnapshot {
    /// Merge the two provider results. Returns `None` when both are absent.
    pub fn assemble(
        requested: &str,
        profile: Option<Profile>,
        skills: Option<SkillTable>,
    ) -> Option<Self> {
        if profile.is_none() && skills.is_none() {
            return None;
        }

        let overall = skills.as_ref().and_then(|s| s.get("Overall")).copied();
        let profile = profile.unwrap_or_default();
        let recent_activity = profile.activities.first().map(|activity| {
            activity
                .text
                .clone()
                .unwrap_or_else(|| "Unknown".to_string())
        });

        Some(PlayerSnapshot {
            display_name: profile.name.unwrap_or_else(|| requested.to_string()),
            total_xp: profile.total_xp.or(overall.map(|o| o.xp)),
            total_level: profile.total_skill.or(overall.map(|o| o.level)),
            combat_level: profile.combat_level,
            quests_complete: profile.quests_complete,
            quests_started: profile.quests_started,
            quests_not_started: profile.quests_not_started,
            recent_activity,
            skills,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestProgress {
    pub complete: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub display_name: String,
    pub total_xp: Option<String>,
    pub total_level: Option<i64>,
    pub combat_level: Option<i64>,
    pub quests: Option<QuestProgress>,
    pub recent_activity: Option<String>,
    pub combat_skills: Vec<(&'static str, i64)>,
}

pub fn build_stats_report(snapshot: &PlayerSnapshot) -> StatsReport {
    let complete = snapshot.quests_complete.unwrap_or(0);
    let quests = (complete > 0).then(|| QuestProgress {
        complete,
        total: complete
            + snapshot.quests_started.unwrap_or(0)
            + snapshot.quests_not_started.unwrap_or(0),
    });

    let combat_skills = match &snapshot.skills {
        Some(table) => COMBAT_SKILLS
            .iter()
            .filter_map(|&skill| table.get(skill).map(|s| (skill, s.level)))
            .collect(),
        None => Vec::new(),
    };

    StatsReport {
        display_name: snapshot.display_name.clone(),
        total_xp: snapshot.total_xp.map(format_number),
        total_level: snapshot.total_level,
        combat_level: snapshot.combat_level,
        quests,
        recent_activity: snapshot
            .recent_activity
            .as_ref()
            .map(|text| text.chars().take(ACTIVITY_PREVIEW_CHARS).collect()),
        combat_skills,
    }
}

impl StatsReport {
    pub fn to_embed(&self) -> Embed {
        let mut embed = Embed::new(format!("📊 Stats for {}", self.display_name));
        if let Some(xp) = &self.total_xp {
            embed = embed.field("Total XP", xp.as_str(), true);
        }
        if let Some(level) = self.total_level {
            embed = embed.field("Total Level", level.to_string(), true);
        }
        if let Some(level) = self.combat_level {
            embed = embed.field("Combat Level", level.to_string(), true);
        }
        if let Some(q) = self.quests {
            embed = embed.field("Quests", format!("{}/{}", q.complete, q.total), true);
        }
        if let Some(activity) = &self.recent_activity {
            embed = embed.field("Recent Activity", activity.as_str(), false);
        }
        if !self.combat_skills.is_empty() {
            let text = self
                .combat_skills
                .iter()
                .map(|(skill, level)| format!("**{skill}:** {level}"))
                .collect::<Vec<_>>()
                .join(" | ");
            embed = embed.field("Combat Stats", text, false);
        }
        embed
    }
}

// ── Comparison ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub label: &'static str,
    pub left: i64,
    pub right: i64,
    pub left_display: String,
    pub right_display: String,
    /// `None` on a tie.
    pub winner: Option<Side>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub left_name: String,
    pub right_name: String,
    pub rows: Vec<ComparisonRow>,
}

pub fn build_comparison(
    left_requested: &str,
    left: &Profile,
    right_requested: &str,
    right: &Profile,
) -> ComparisonReport {
    let metrics: [(&'static str, Option<i64>, Option<i64>, bool); 4] = [
        ("Total XP", left.total_xp, right.total_xp, true),
        ("Total Level", left.total_skill, right.total_skill, false),
        ("Combat Level", left.combat_level, right.combat_level, false),
        ("Quests Complete", left.quests_complete, right.quests_complete, false),
    ];

    let rows = metrics
        .into_iter()
        .map(|(label, l, r, is_xp)| {
            let (l, r) = (l.unwrap_or(0), r.unwrap_or(0));
            let display = |v: i64| if is_xp { format_number(v) } else { v.to_string() };
            let winner = match l.cmp(&r) {
                std::cmp::Ordering::Greater => Some(Side::Left),
                std::cmp::Ordering::Less => Some(Side::Right),
                std::cmp::Ordering::Equal => None,
            };
            ComparisonRow {
                label,
                left: l,
                right: r,
                left_display: display(l),
                right_display: display(r),
                winner,
            }
        })
        .collect();

    ComparisonReport {
        left_name: left.name.clone().unwrap_or_else(|| left_requested.to_string()),
        right_name: right.name.clone().unwrap_or_else(|| right_requested.to_string()),
        rows,
    }
}

impl ComparisonRow {
    pub fn render(&self) -> String {
        let mark = |side: Side| {
            if self.winner == Some(side) {
                format!(" {WINNER_MARK}")
            } else {
                String::new()
            }
        };
        format!(
            "{}{} vs {}{}",
            self.left_display,
            mark(Side::Left),
            self.right_display,
            mark(Side::Right)
        )
    }
}

impl ComparisonReport {
    pub fn to_embed(&self) -> Embed {
        self.rows.iter().fold(
            Embed::new(format!("⚔️ {} vs {}", self.left_name, self.right_name)),
            |embed, row| embed.field(row.label, row.render(), true),
        )
    }
}

// ── Leaderboard ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub total_xp: i64,
    pub total_level: i64,
}

impl LeaderboardEntry {
    pub fn from_profile(requested: &str, profile: &Profile) -> Self {
        LeaderboardEntry {
            name: profile.name.clone().unwrap_or_else(|| requested.to_string()),
            total_xp: profile.total_xp.unwrap_or(0),
            total_level: profile.total_skill.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Medal(usize),
    Position(usize),
}

impl Rank {
    fn for_position(position: usize) -> Self {
        if position <= MEDALS.len() {
            Rank::Medal(position)
        } else {
            Rank::Position(position)
        }
    }

    pub fn render(self) -> String {
        match self {
            Rank::Medal(position) => MEDALS[position - 1].to_string(),
            Rank::Position(position) => format!("**{position}.**"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub rank: Rank,
    pub entry: LeaderboardEntry,
}

/// Sort by experience (stable), keep the top [`LEADERBOARD_SIZE`] and rank them.
pub fn build_leaderboard(mut entries: Vec<LeaderboardEntry>) -> Vec<RankedEntry> {
    entries.sort_by(|a, b| b.total_xp.cmp(&a.total_xp));
    entries
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(i, entry)| RankedEntry {
            rank: Rank::for_position(i + 1),
            entry,
        })
        .collect()
}

pub fn leaderboard_embed(ranked: &[RankedEntry]) -> Embed {
    let text = ranked
        .iter()
        .map(|r| {
            format!(
                "{} **{}** - {} XP (Level {})",
                r.rank.render(),
                r.entry.name,
                format_number(r.entry.total_xp),
                r.entry.total_level
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let description = if text.is_empty() {
        "No data available".to_string()
    } else {
        text
    };
    Embed::new("🏆 Clan Leaderboard").description(description)
}

// ── Ledger listings ──────────────────────────────────────────────────

fn date_part(timestamp: &str) -> String {
    timestamp.chars().take(10).collect()
}

pub fn accounts_embed(links: &[AccountLink]) -> Embed {
    links.iter().fold(Embed::new("🔗 Your Linked Accounts"), |embed, link| {
        embed.field(
            link.rsn.as_str(),
            format!("Linked: {}", date_part(&link.linked_at)),
            true,
        )
    })
}

pub fn drops_embed(drops: &[DropEvent]) -> Embed {
    drops.iter().fold(Embed::new("📜 Recent Drops"), |embed, drop| {
        embed.field(
            drop.item_name.as_str(),
            format!("**{}** - {}", drop.rsn, date_part(&drop.timestamp)),
            true,
        )
    })
}
