// src/assembler.rs

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{AhgoraError, Result};
use crate::parser::{AttendanceRow, DayBalance};

/// chrono equivalent of the portal's `Y-m-d H:i` date labels and punch tokens.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A single clock event. Direction is implied by position within the day and left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PunchRecord {
    pub at: NaiveDateTime,
}

impl PunchRecord {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at }
    }

    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.at.time()
    }

    pub fn day(&self) -> u32 {
        self.at.day()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBalance {
    pub date: String,
    #[serde(flatten)]
    pub balance: DayBalance,
}

/// Punches of a period plus, when the backend reports them, the per-day balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timesheet {
    pub punches: Vec<PunchRecord>,
    pub balances: Vec<DailyBalance>,
}

/// Turns rows into timestamps, keeping row order and token order.
///
/// All or nothing: the first date/token pair that does not parse under `datetime_format` fails
/// the whole call with `MalformedPunch`.
pub fn assemble(rows: &[AttendanceRow], datetime_format: &str) -> Result<Vec<PunchRecord>> {
    let mut punches = Vec::new();
    for row in rows {
        for token in &row.punch_tokens {
            punches.push(parse_punch(&row.date_label, token, datetime_format)?);
        }
    }
    Ok(punches)
}

pub fn assemble_timesheet(rows: &[AttendanceRow], datetime_format: &str) -> Result<Timesheet> {
    let punches = assemble(rows, datetime_format)?;
    let balances = rows
        .iter()
        .filter_map(|row| {
            row.balance.as_ref().map(|balance| DailyBalance {
                date: row.date_label.clone(),
                balance: balance.clone(),
            })
        })
        .collect();
    Ok(Timesheet { punches, balances })
}

fn parse_punch(date_label: &str, token: &str, datetime_format: &str) -> Result<PunchRecord> {
    let input = format!("{} {}", date_label, token);
    NaiveDateTime::parse_from_str(&input, datetime_format)
        .map(PunchRecord::new)
        .map_err(|_| AhgoraError::MalformedPunch {
            date: date_label.to_string(),
            token: token.to_string(),
            format: datetime_format.to_string(),
        })
}
