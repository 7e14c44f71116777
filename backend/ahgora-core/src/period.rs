// src/period.rs

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::assembler::PunchRecord;
use crate::error::{AhgoraError, Result};

/// Day of month from which "now" belongs to the next pay period.
pub const ROLLOVER_DAY: u32 = 20;

/// A reporting month of the portal. Pay periods start on the 20th of the previous calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayPeriod {
    pub month: u32,
    pub year: i32,
}

impl PayPeriod {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AhgoraError::InvalidPeriod(format!(
                "month {} is outside 1..=12",
                month
            )));
        }
        Ok(Self { month, year })
    }

    /// Month zero-padded to two digits, as the portal expects it in URLs and forms.
    pub fn month_padded(&self) -> String {
        format!("{:02}", self.month)
    }

    fn next(self) -> Self {
        if self.month == 12 {
            Self {
                month: 1,
                year: self.year + 1,
            }
        } else {
            Self {
                month: self.month + 1,
                year: self.year,
            }
        }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}", self.month, self.year)
    }
}

/// The pay period whose report lists the punches of `date`.
pub fn period_for_date(date: NaiveDate) -> PayPeriod {
    let period = PayPeriod {
        month: date.month(),
        year: date.year(),
    };
    if date.day() >= ROLLOVER_DAY {
        period.next()
    } else {
        period
    }
}

/// Resolves the period a caller asked for.
///
/// With no input the period containing `today` is returned, rolling to the next month from the
/// 20th on. Explicit input is validated as is: it must name a real month and must not lie after
/// the current calendar month. A single missing field falls back to today's month or year.
pub fn resolve(month: Option<u32>, year: Option<i32>, today: NaiveDate) -> Result<PayPeriod> {
    if month.is_none() && year.is_none() {
        return Ok(period_for_date(today));
    }

    let month = month.unwrap_or_else(|| today.month());
    let year = year.unwrap_or_else(|| today.year());
    let period = PayPeriod::new(month, year)?;

    if year > today.year() {
        return Err(AhgoraError::InvalidPeriod(format!(
            "year {} is after the current year {}",
            year,
            today.year()
        )));
    }
    if year == today.year() && month > today.month() {
        return Err(AhgoraError::InvalidPeriod(format!(
            "{} is after the current month {:02}-{}",
            period,
            today.month(),
            today.year()
        )));
    }

    Ok(period)
}

/// Normalizes a possibly overflowing (day, month, year) the way calendar arithmetic does:
/// day 0 is the last day of the previous month, month 13 is January of the next year.
pub fn normalize_day(day: i32, month: i32, year: i32) -> Result<NaiveDate> {
    let invalid = || {
        AhgoraError::InvalidPeriod(format!(
            "day {} of month {} of {} is not representable",
            day, month, year
        ))
    };

    let months_total = i64::from(year) * 12 + i64::from(month) - 1;
    let norm_year = i32::try_from(months_total.div_euclid(12)).map_err(|_| invalid())?;
    let norm_month = months_total.rem_euclid(12) as u32 + 1;

    let first = NaiveDate::from_ymd_opt(norm_year, norm_month, 1).ok_or_else(invalid)?;
    first
        .checked_add_signed(Duration::days(i64::from(day) - 1))
        .ok_or_else(invalid)
}

/// The pay period holding the punches of one calendar day.
pub fn resolve_for_day(day: i32, month: i32, year: i32) -> Result<PayPeriod> {
    normalize_day(day, month, year).map(period_for_date)
}

/// Keeps the punches whose day of month equals `day`.
pub fn filter_day(punches: Vec<PunchRecord>, day: u32) -> Vec<PunchRecord> {
    punches.into_iter().filter(|p| p.day() == day).collect()
}
