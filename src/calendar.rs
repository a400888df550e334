//! ISO week arithmetic and tournament timing.
//!
//! Everything the engine schedules hangs off ISO weeks: entry deadlines,
//! draw publication, ranking publication and the 52-week ranking window.
//! All clock times are UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::rules::TimingRules;

/// ISO week identifier. The ISO year may differ from the calendar year near
/// year boundaries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    /// ISO week containing a date.
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday of this ISO week.
    pub fn monday(&self) -> EngineResult<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).ok_or_else(|| {
            EngineError::Configuration(format!(
                "invalid ISO week {}-W{:02}",
                self.year, self.week
            ))
        })
    }

    /// Shift by whole ISO weeks via the Monday anchor.
    pub fn add_weeks(&self, delta: i64) -> EngineResult<IsoWeek> {
        let shifted = self.monday()? + Duration::weeks(delta);
        Ok(IsoWeek::of(shifted))
    }

    /// Date of the given weekday in this week, 0 = Monday.
    fn weekday_date(&self, weekday_offset: u8) -> EngineResult<NaiveDate> {
        Ok(self.monday()? + Duration::days(i64::from(weekday_offset)))
    }
}

fn at_hour(date: NaiveDate, hour: u8) -> EngineResult<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(u32::from(hour), 0, 0)
        .ok_or_else(|| EngineError::Configuration(format!("invalid hour {hour}")))?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Entry deadline for a tournament played in ISO week W: the configured
/// weekday/hour of week W-1.
pub fn entry_deadline(timing: &TimingRules, tournament_week: IsoWeek) -> EngineResult<DateTime<Utc>> {
    let prev = tournament_week.add_weeks(-1)?;
    at_hour(
        prev.weekday_date(timing.entry_deadline_weekday)?,
        timing.entry_deadline_hour,
    )
}

/// Draw publication instant for a tournament played in ISO week W: the
/// configured weekday/hour of week W-1.
pub fn draw_publication(
    timing: &TimingRules,
    tournament_week: IsoWeek,
) -> EngineResult<DateTime<Utc>> {
    let prev = tournament_week.add_weeks(-1)?;
    at_hour(
        prev.weekday_date(timing.draw_publication_weekday)?,
        timing.draw_publication_hour,
    )
}

/// Ranking publication instant: Monday of the ranking week at the configured
/// hour.
pub fn ranking_publication(
    timing: &TimingRules,
    ranking_week: IsoWeek,
) -> EngineResult<DateTime<Utc>> {
    at_hour(ranking_week.monday()?, timing.ranking_publication_hour)
}

/// Ranking week whose publication seeds a tournament in week W: week W-1.
pub fn seeding_ranking_week(tournament_week: IsoWeek) -> EngineResult<IsoWeek> {
    tournament_week.add_weeks(-1)
}

/// Inclusive window of tournament weeks counted toward a ranking week:
/// [week - rolling_weeks, week - 1].
pub fn ranking_window(
    ranking_week: IsoWeek,
    rolling_weeks: u32,
) -> EngineResult<(IsoWeek, IsoWeek)> {
    let start = ranking_week.add_weeks(-i64::from(rolling_weeks))?;
    let end = ranking_week.add_weeks(-1)?;
    Ok((start, end))
}
