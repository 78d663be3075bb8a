//! Relative-date section headers for the conversation history ("Today", "Yesterday",
//! "3 days ago", ..., "2024.03").
//!
//! Input is expected newest-first. The pass is linear and never sorts; a header is
//! inserted right before the first record of each bucket.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};

use crate::state::ConversationRecord;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecencyBucket {
    Today,
    Yesterday,
    /// 2..=6
    DaysAgo(u8),
    LastWeek,
    /// 2..=4
    WeeksAgo(u8),
    Month { year: i32, month: u32 },
}

impl fmt::Display for RecencyBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecencyBucket::Today => f.write_str("Today"),
            RecencyBucket::Yesterday => f.write_str("Yesterday"),
            RecencyBucket::DaysAgo(n) => write!(f, "{n} days ago"),
            RecencyBucket::LastWeek => f.write_str("Last week"),
            RecencyBucket::WeeksAgo(n) => write!(f, "{n} weeks ago"),
            RecencyBucket::Month { year, month } => write!(f, "{year}.{month:02}"),
        }
    }
}

/// Local midnight of `now`, in milliseconds.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| now.timezone().from_local_datetime(&midnight).earliest())
        .map(|midnight| midnight.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

/// Day/week bucket for `timestamp`, or `None` when it is older than four weeks and
/// falls back to a calendar month.
pub fn relative_bucket(timestamp: i64, today_start: i64) -> Option<RecencyBucket> {
    let ago = |days: i64| today_start - days * DAY_MS;

    if timestamp >= today_start {
        return Some(RecencyBucket::Today);
    }
    if timestamp >= ago(1) {
        return Some(RecencyBucket::Yesterday);
    }
    for days in 2..=6u8 {
        if timestamp >= ago(days as i64) {
            return Some(RecencyBucket::DaysAgo(days));
        }
    }
    if timestamp >= ago(13) {
        return Some(RecencyBucket::LastWeek);
    }
    for (weeks, days) in [(2u8, 20i64), (3, 27), (4, 34)] {
        if timestamp >= ago(days) {
            return Some(RecencyBucket::WeeksAgo(weeks));
        }
    }
    None
}

/// Calendar month containing a timestamp, as a half-open `[start, end)` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MonthWindow {
    bucket: RecencyBucket,
    start: i64,
    end: i64,
}

impl MonthWindow {
    fn containing<Tz: TimeZone>(tz: &Tz, timestamp: i64) -> Self {
        let local = tz
            .timestamp_millis_opt(timestamp)
            .single()
            .unwrap_or_else(|| tz.from_utc_datetime(&NaiveDateTime::default()));
        let (year, month) = (local.year(), local.month());
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let bucket = RecencyBucket::Month { year, month };
        match (
            month_start(tz, year, month),
            month_start(tz, next_year, next_month),
        ) {
            (Some(start), Some(end)) => Self { bucket, start, end },
            // Unrepresentable bounds: a one-record window still yields the right label.
            _ => Self {
                bucket,
                start: timestamp,
                end: timestamp.saturating_add(1),
            },
        }
    }

    fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

fn month_start<Tz: TimeZone>(tz: &Tz, year: i32, month: u32) -> Option<i64> {
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|start| start.timestamp_millis())
}

struct GroupingPass {
    out: Vec<ConversationRecord>,
    seen: HashSet<RecencyBucket>,
    open_month: Option<MonthWindow>,
    next_header_id: i64,
    previous_timestamp: Option<i64>,
    out_of_order: bool,
}

impl GroupingPass {
    fn with_capacity(len: usize) -> Self {
        Self {
            out: Vec::with_capacity(len + 8),
            seen: HashSet::new(),
            open_month: None,
            next_header_id: -1,
            previous_timestamp: None,
            out_of_order: false,
        }
    }

    fn push(&mut self, bucket: RecencyBucket, record: &ConversationRecord) {
        if self.seen.insert(bucket) {
            self.out.push(ConversationRecord {
                id: self.next_header_id,
                timestamp: 0,
                title: bucket.to_string(),
                mode: String::new(),
            });
            self.next_header_id -= 1;
        }
        if self
            .previous_timestamp
            .is_some_and(|previous| record.timestamp > previous)
        {
            self.out_of_order = true;
        }
        self.previous_timestamp = Some(record.timestamp);
        self.out.push(record.clone());
    }
}

/// Groups `records` relative to `now`. Pure: the same inputs always produce the
/// same output and `records` is left untouched.
pub fn group_by_recency_at<Tz: TimeZone>(
    records: &[ConversationRecord],
    now: &DateTime<Tz>,
) -> Vec<ConversationRecord> {
    let tz = now.timezone();
    let today_start = start_of_day(now);

    let pass = records.iter().fold(
        GroupingPass::with_capacity(records.len()),
        |mut pass, record| {
            let bucket = match relative_bucket(record.timestamp, today_start) {
                Some(bucket) => bucket,
                None => {
                    let window = match pass.open_month {
                        Some(open) if open.contains(record.timestamp) => open,
                        _ => MonthWindow::containing(&tz, record.timestamp),
                    };
                    pass.open_month = Some(window);
                    window.bucket
                }
            };
            pass.push(bucket, record);
            pass
        },
    );

    if pass.out_of_order {
        tracing::debug!(
            records = records.len(),
            "conversation history not sorted newest-first; grouping may split visually"
        );
    }
    pass.out
}

pub fn group_by_recency(records: &[ConversationRecord]) -> Vec<ConversationRecord> {
    group_by_recency_at(records, &Local::now())
}
