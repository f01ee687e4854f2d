// Command surface: one async function per slash command, plus the dispatch
// boundary that turns every per-request failure into a reply.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;
use thiserror::Error;

use crate::db::{Database, LedgerError};
use crate::metrics;
use crate::report::{
    accounts_embed, build_comparison, build_leaderboard, build_stats_report, drops_embed,
    leaderboard_embed, Embed, LeaderboardEntry, PlayerSnapshot, Reply,
};
use crate::upstream::UpstreamClient;

/// Shared handles passed to every command.
#[derive(Clone)]
pub struct AppContext {
    pub db: Arc<Database>,
    pub upstream: UpstreamClient,
}

impl AppContext {
    pub fn new(db: Arc<Database>, upstream: UpstreamClient) -> Self {
        Self { db, upstream }
    }
}

/// Who issued the command, as reported by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    pub id: String,
    pub display_name: Option<String>,
}

impl Caller {
    pub fn new(id: impl Into<String>) -> Self {
        Caller {
            id: id.into(),
            display_name: None,
        }
    }

    fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum Command {
    Link { rsn: String },
    Unlink { rsn: String },
    Accounts,
    Stats {
        #[serde(default)]
        rsn: Option<String>,
    },
    Compare { rsn1: String, rsn2: String },
    Drop {
        item: String,
        #[serde(default)]
        rsn: Option<String>,
    },
    Drops {
        #[serde(default)]
        rsn: Option<String>,
    },
    Leaderboard,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Link { .. } => "link",
            Command::Unlink { .. } => "unlink",
            Command::Accounts => "accounts",
            Command::Stats { .. } => "stats",
            Command::Compare { .. } => "compare",
            Command::Drop { .. } => "drop",
            Command::Drops { .. } => "drops",
            Command::Leaderboard => "leaderboard",
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("player {0} not found")]
    PlayerNotFound(String),
    #[error("players not found: {0:?}")]
    PlayersNotFound(Vec<String>),
    #[error("{0} is already linked")]
    DuplicateLink(String),
    #[error("{0} is not linked")]
    NotLinked(String),
    #[error("caller has no linked accounts")]
    NoLinkedAccounts,
    #[error("no rsn given and no linked account")]
    NoRsn,
    #[error("no drops logged")]
    NoDrops,
    #[error("no accounts linked by anyone")]
    NoAccountsLinked,
    #[error("database error: {0}")]
    Internal(#[from] sqlx::Error),
}

impl From<LedgerError> for CommandError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DuplicateLink(name) => CommandError::DuplicateLink(name),
            LedgerError::Database(e) => CommandError::Internal(e),
        }
    }
}

impl CommandError {
    /// User-visible rendering of the failure.
    pub fn into_reply(self) -> Reply {
        match self {
            CommandError::PlayerNotFound(rsn) => Reply::ephemeral(format!(
                "❌ Could not find player **{rsn}**. Make sure the name is correct and the profile is public."
            )),
            CommandError::PlayersNotFound(names) => {
                Reply::ephemeral(format!("❌ Could not find player(s): {}", names.join(", ")))
            }
            CommandError::DuplicateLink(rsn) => {
                Reply::ephemeral(format!("⚠️ **{rsn}** is already linked to your account."))
            }
            CommandError::NotLinked(rsn) => {
                Reply::ephemeral(format!("❌ **{rsn}** is not linked to your account."))
            }
            CommandError::NoLinkedAccounts => {
                Reply::ephemeral("You need to link an account first with `/link`.")
            }
            CommandError::NoRsn => {
                Reply::ephemeral("Please provide an RSN or link an account with `/link`.")
            }
            CommandError::NoDrops => Reply::ephemeral("No drops logged yet!"),
            CommandError::NoAccountsLinked => Reply::message("No accounts linked yet!"),
            CommandError::Internal(e) => {
                tracing::error!("Database error: {e}");
                Reply::ephemeral("Something went wrong, please try again later.")
            }
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            CommandError::Internal(_) => "error",
            _ => "rejected",
        }
    }
}

/// Run a command and convert any failure into a reply.
pub async fn dispatch(ctx: &AppContext, caller: &Caller, command: Command) -> Reply {
    let name = command.name();
    tracing::debug!("command {name} from {}", caller.id);

    let result = match command {
        Command::Link { rsn } => link(ctx, caller, &rsn).await,
        Command::Unlink { rsn } => unlink(ctx, caller, &rsn).await,
        Command::Accounts => accounts(ctx, caller).await,
        Command::Stats { rsn } => stats(ctx, caller, rsn.as_deref()).await,
        Command::Compare { rsn1, rsn2 } => compare(ctx, &rsn1, &rsn2).await,
        Command::Drop { item, rsn } => log_drop(ctx, caller, &item, rsn.as_deref()).await,
        Command::Drops { rsn } => drops(ctx, rsn.as_deref()).await,
        Command::Leaderboard => leaderboard(ctx).await,
    };

    match result {
        Ok(reply) => {
            metrics::COMMANDS_TOTAL.with_label_values(&[name, "ok"]).inc();
            reply
        }
        Err(e) => {
            metrics::COMMANDS_TOTAL
                .with_label_values(&[name, e.outcome_label()])
                .inc();
            e.into_reply()
        }
    }
}

// ── Account linking ──────────────────────────────────────────────────

/// Verify the player exists, then store the link under its canonical name.
pub async fn link(ctx: &AppContext, caller: &Caller, rsn: &str) -> Result<Reply, CommandError> {
    let profile = ctx
        .upstream
        .fetch_profile(rsn)
        .await
        .found()
        .ok_or_else(|| CommandError::PlayerNotFound(rsn.to_string()))?;
    let canonical = profile.name.unwrap_or_else(|| rsn.to_string());

    let link = ctx.db.link_account(&caller.id, &canonical).await?;
    metrics::LINKED_ACCOUNTS_TOTAL.inc();
    tracing::info!("{} linked {}", caller.id, link.rsn);

    Ok(Reply::message(format!(
        "✅ Successfully linked **{}** to your account!",
        link.rsn
    )))
}

pub async fn unlink(ctx: &AppContext, caller: &Caller, rsn: &str) -> Result<Reply, CommandError> {
    let removed = ctx.db.unlink_account(&caller.id, rsn).await?;
    if removed == 0 {
        return Err(CommandError::NotLinked(rsn.to_string()));
    }
    Ok(Reply::message(format!("✅ Unlinked **{rsn}** from your account.")))
}

pub async fn accounts(ctx: &AppContext, caller: &Caller) -> Result<Reply, CommandError> {
    let links = ctx.db.list_links(&caller.id).await?;
    if links.is_empty() {
        return Ok(Reply::ephemeral(
            "You don't have any linked accounts. Use `/link <rsn>` to add one!",
        ));
    }
    Ok(Reply::embed(accounts_embed(&links)))
}

// ── Stats lookup ─────────────────────────────────────────────────────

pub async fn stats(
    ctx: &AppContext,
    caller: &Caller,
    rsn: Option<&str>,
) -> Result<Reply, CommandError> {
    let rsn = match rsn.filter(|r| !r.trim().is_empty()) {
        Some(rsn) => rsn.to_string(),
        None => ctx
            .db
            .list_links(&caller.id)
            .await?
            .into_iter()
            .next()
            .map(|link| link.rsn)
            .ok_or(CommandError::NoRsn)?,
    };

    let (profile, skills) = tokio::join!(
        ctx.upstream.fetch_profile(&rsn),
        ctx.upstream.fetch_skills(&rsn)
    );

    let snapshot = PlayerSnapshot::assemble(&rsn, profile.found(), skills.found())
        .ok_or_else(|| CommandError::PlayerNotFound(rsn.clone()))?;
    let embed = build_stats_report(&snapshot).to_embed().timestamp(Utc::now());
    Ok(Reply::embed(embed))
}

pub async fn compare(ctx: &AppContext, rsn1: &str, rsn2: &str) -> Result<Reply, CommandError> {
    let (left, right) = tokio::join!(
        ctx.upstream.fetch_profile(rsn1),
        ctx.upstream.fetch_profile(rsn2)
    );

    match (left.found(), right.found()) {
        (Some(left), Some(right)) => {
            let report = build_comparison(rsn1, &left, rsn2, &right);
            Ok(Reply::embed(report.to_embed()))
        }
        (left, right) => {
            let mut missing = Vec::new();
            if left.is_none() {
                missing.push(rsn1.to_string());
            }
            if right.is_none() {
                missing.push(rsn2.to_string());
            }
            Err(CommandError::PlayersNotFound(missing))
        }
    }
}

// ── Drop logging ─────────────────────────────────────────────────────

/// Record a drop against one of the caller's linked accounts.
pub async fn log_drop(
    ctx: &AppContext,
    caller: &Caller,
    item: &str,
    rsn: Option<&str>,
) -> Result<Reply, CommandError> {
    let links = ctx.db.list_links(&caller.id).await?;
    let first = links.first().ok_or(CommandError::NoLinkedAccounts)?;

    // Stored under the linked (canonical) spelling, not the typed one
    let selected = match rsn {
        Some(rsn) => links
            .iter()
            .find(|l| l.rsn.to_lowercase() == rsn.to_lowercase())
            .map(|l| l.rsn.clone())
            .ok_or_else(|| CommandError::NotLinked(rsn.to_string()))?,
        None => first.rsn.clone(),
    };

    let event = ctx.db.record_drop(&caller.id, &selected, item).await?;
    metrics::DROPS_LOGGED_TOTAL.inc();

    let embed = Embed::new("🎉 Rare Drop!")
        .description(format!("**{}** received **{}**!", event.rsn, event.item_name))
        .footer(format!("Logged by {}", caller.label()))
        .timestamp(Utc::now());
    Ok(Reply::embed(embed))
}

pub async fn drops(ctx: &AppContext, rsn: Option<&str>) -> Result<Reply, CommandError> {
    let drops = ctx.db.list_drops(rsn).await?;
    if drops.is_empty() {
        return Err(CommandError::NoDrops);
    }
    Ok(Reply::embed(drops_embed(&drops)))
}

// ── Clan leaderboard ─────────────────────────────────────────────────

pub async fn leaderboard(ctx: &AppContext) -> Result<Reply, CommandError> {
    let names = ctx.db.distinct_linked_names().await?;
    if names.is_empty() {
        return Err(CommandError::NoAccountsLinked);
    }

    // join_all keeps input order, so the stable sort below is deterministic
    let lookups = join_all(names.iter().map(|name| ctx.upstream.fetch_profile(name))).await;
    let entries: Vec<LeaderboardEntry> = names
        .iter()
        .zip(lookups)
        .filter_map(|(name, lookup)| {
            lookup
                .found()
                .map(|profile| LeaderboardEntry::from_profile(name, &profile))
        })
        .collect();

    Ok(Reply::embed(leaderboard_embed(&build_leaderboard(entries))))
}
