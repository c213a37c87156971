//! Recurrence frequencies and date cycle arithmetic
//!
//! Month-based frequencies keep the day of month of the series anchor and
//! clamp to the last day of shorter months, so a series anchored on the 31st
//! goes 01-31, 02-29, 03-31, 04-30 instead of drifting to the 29th.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::money::Money;

/// How often a template or subscription repeats
///
/// Legacy data may hold names this build does not understand. Those are kept
/// verbatim as `Unknown` so they survive a backup round trip; advancing an
/// unknown frequency returns the input date unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Days(i64),
    Months(u32),
}

impl Frequency {
    /// All frequencies the calculator knows how to advance
    pub const KNOWN: [Frequency; 4] = [
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ];

    fn step(&self) -> Option<Step> {
        match self {
            Self::Weekly => Some(Step::Days(7)),
            Self::Monthly => Some(Step::Months(1)),
            Self::Quarterly => Some(Step::Months(3)),
            Self::Yearly => Some(Step::Months(12)),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.step().is_some()
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Unknown(raw) => raw,
        }
    }

    /// Next occurrence after `date`, anchored on `date` itself
    pub fn advance(&self, date: NaiveDate) -> NaiveDate {
        Schedule::new(date, self.clone()).occurrence(1)
    }

    /// Convert a per-cycle amount into its per-month equivalent
    pub fn monthly_amount(&self, amount: Money) -> Option<Money> {
        match self {
            Self::Weekly => Some(amount.scale(52, 12)),
            Self::Monthly => Some(amount),
            Self::Quarterly => Some(amount.scale(1, 3)),
            Self::Yearly => Some(amount.scale(1, 12)),
            Self::Unknown(_) => None,
        }
    }
}

impl From<String> for Frequency {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "weekly" | "settimanale" => Self::Weekly,
            "monthly" | "mensile" => Self::Monthly,
            "quarterly" | "trimestrale" => Self::Quarterly,
            "yearly" | "annual" | "annuale" => Self::Yearly,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    /// Strict parse for user input: unknown names are an error here
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Frequency::from(s.to_string()) {
            Frequency::Unknown(raw) => Err(format!(
                "unknown frequency '{}' (expected weekly, monthly, quarterly or yearly)",
                raw
            )),
            known => Ok(known),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Advance `date` by one cycle of `frequency`
///
/// Unknown frequencies return `date` unchanged; callers must treat that as
/// the end of the series.
pub fn next(date: NaiveDate, frequency: &Frequency) -> NaiveDate {
    frequency.advance(date)
}

/// A series defined by its first date and frequency
///
/// Month-based steps land on `day` (clamped to the month length). It is the
/// anchor's own day unless the series started earlier on a later day, as
/// with a subscription whose cursor was clamped into a short month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    anchor: NaiveDate,
    frequency: Frequency,
    day: u32,
}

impl Schedule {
    pub fn new(anchor: NaiveDate, frequency: Frequency) -> Self {
        Self::with_anchor_day(anchor, frequency, anchor.day())
    }

    /// A series starting at `start` whose month steps keep `day`
    pub fn with_anchor_day(start: NaiveDate, frequency: Frequency, day: u32) -> Self {
        Self {
            anchor: start,
            frequency,
            day: day.clamp(1, 31),
        }
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    pub fn anchor_day(&self) -> u32 {
        self.day
    }

    /// The `n`-th occurrence, where occurrence 0 is the anchor
    ///
    /// Computed from the anchor rather than from the previous occurrence so
    /// clamping in a short month never shifts later dates.
    pub fn occurrence(&self, n: u32) -> NaiveDate {
        if n == 0 {
            return self.anchor;
        }
        match self.frequency.step() {
            None => self.anchor,
            Some(Step::Days(days)) => self
                .anchor
                .checked_add_signed(Duration::days(days * n as i64))
                .unwrap_or(NaiveDate::MAX),
            Some(Step::Months(months)) => {
                add_months_clamped(self.anchor, months as i64 * n as i64, self.day)
            }
        }
    }

    /// Occurrences strictly after the anchor, stopping as soon as a step
    /// makes no progress
    pub fn upcoming(&self) -> Occurrences<'_> {
        Occurrences {
            schedule: self,
            index: 1,
            previous: self.anchor,
        }
    }
}

/// Iterator over the occurrences of a [`Schedule`] after its anchor
pub struct Occurrences<'a> {
    schedule: &'a Schedule,
    index: u32,
    previous: NaiveDate,
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let date = self.schedule.occurrence(self.index);
        if date <= self.previous {
            return None;
        }
        self.index = self.index.checked_add(1)?;
        self.previous = date;
        Some(date)
    }
}

fn add_months_clamped(anchor: NaiveDate, months: i64, day: u32) -> NaiveDate {
    let total = anchor.year() as i64 * 12 + anchor.month0() as i64 + months;
    let year = match i32::try_from(total.div_euclid(12)) {
        Ok(year) => year,
        Err(_) => return NaiveDate::MAX,
    };
    let month = total.rem_euclid(12) as u32 + 1;
    let day = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
