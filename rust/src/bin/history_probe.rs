//! Prints a conversation history export the way the history screen groups it.
//!
//! usage: history_probe <records.json> [--now <RFC3339>]

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Local};

use shopfloor_core::grouping::group_by_recency_at;
use shopfloor_core::ConversationRecord;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: history_probe <records.json> [--now RFC3339]"))?;

    let mut now: Option<DateTime<FixedOffset>> = None;
    while let Some(a) = args.next() {
        if a == "--now" {
            let v = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--now requires a timestamp"))?;
            now = Some(DateTime::parse_from_rfc3339(&v).with_context(|| format!("parse {v}"))?);
            continue;
        }
        return Err(anyhow::anyhow!("unknown arg: {a}"));
    }

    let bytes = std::fs::read(&path).with_context(|| format!("read {path}"))?;
    let mut records: Vec<ConversationRecord> =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {path}"))?;
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let now = now.unwrap_or_else(|| Local::now().fixed_offset());
    tracing::info!(records = records.len(), now = %now, "grouping");

    for row in group_by_recency_at(&records, &now) {
        if row.is_group_header() {
            println!("== {} ==", row.title);
        } else {
            println!("  [{}] {} ({})", row.id, row.title, row.timestamp);
        }
    }
    Ok(())
}
