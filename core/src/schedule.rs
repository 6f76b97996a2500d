//! Weekly scheduling: which chores show up on which day, and whether each
//! day's occurrence is done.
//!
//! Everything here is a pure function of its inputs. Callers validate
//! chores and normalize the week start to a Monday before calling in, and
//! pass each chore's completions keyed to the target week.

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;

use crate::models::{Chore, CompletionInfo, DayBucket, DayInstance, Frequency, WeekGrid, WeeklyChore};
use crate::week::{DAY_NAMES, day_of_week_in_tz, format_date_range};

/// A set of weekday indices (0 = Monday .. 6 = Sunday).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaySet(u8);

impl DaySet {
    pub const ALL: DaySet = DaySet(0b0111_1111);

    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, day: u8) {
        if day < 7 {
            self.0 |= 1 << day;
        }
    }

    #[must_use]
    pub fn contains(self, day: u8) -> bool {
        day < 7 && self.0 & (1 << day) != 0
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..7).filter(move |d| self.contains(*d))
    }
}

impl FromIterator<u8> for DaySet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

/// Days fixed by the chore's own configuration, empty for unscheduled chores.
#[must_use]
pub fn configured_days(chore: &Chore) -> DaySet {
    match chore.frequency {
        Frequency::TwiceWeekly => [chore.day_of_week, chore.day_of_week_2]
            .into_iter()
            .flatten()
            .collect(),
        Frequency::Daily | Frequency::Weekly => chore.day_of_week.into_iter().collect(),
    }
}

/// Weekdays on which `completions` were recorded, in the household timezone.
#[must_use]
pub fn completion_days(completions: &[CompletionInfo], tz: &Tz) -> DaySet {
    completions
        .iter()
        .map(|c| day_of_week_in_tz(&c.completed_at, tz))
        .collect()
}

/// The weekdays a chore should be shown on.
///
/// Configured days win. A chore with no configured day shows on the days it
/// was completed, or on every day while it has not been done at all.
#[must_use]
pub fn scheduled_days(chore: &Chore, completions: &[CompletionInfo], tz: &Tz) -> DaySet {
    let configured = configured_days(chore);
    if !configured.is_empty() {
        return configured;
    }
    let done = completion_days(completions, tz);
    if done.is_empty() { DaySet::ALL } else { done }
}

/// Project a chore onto a single weekday. The first completion falling on
/// that weekday marks it done.
#[must_use]
pub fn resolve_day(chore: &Chore, completions: &[CompletionInfo], day: u8, tz: &Tz) -> DayInstance {
    let completion = completions
        .iter()
        .find(|c| day_of_week_in_tz(&c.completed_at, tz) == day)
        .cloned();
    DayInstance {
        chore: chore.clone(),
        is_completed: completion.is_some(),
        completion,
    }
}

/// Spread chores over the seven days starting at `week_start`.
///
/// Within a day, pending instances come before completed ones; otherwise
/// input order is kept.
#[must_use]
pub fn build_week_grid(week_start: NaiveDate, chores: &[WeeklyChore], tz: &Tz) -> WeekGrid {
    let mut days: Vec<DayBucket> = (0u8..7)
        .map(|day| DayBucket {
            date: week_start + Duration::days(i64::from(day)),
            day_of_week: day,
            name: DAY_NAMES[usize::from(day)],
            instances: Vec::new(),
        })
        .collect();

    for wc in chores {
        for day in scheduled_days(&wc.chore, &wc.completions, tz).iter() {
            days[usize::from(day)]
                .instances
                .push(resolve_day(&wc.chore, &wc.completions, day, tz));
        }
    }

    for bucket in &mut days {
        bucket.instances.sort_by_key(|inst| inst.is_completed);
    }

    let (completed_chores, total_chores) = weekly_progress(chores, tz);
    let week_end = week_start + Duration::days(6);
    WeekGrid {
        week_start,
        week_end,
        label: format_date_range(week_start, week_end),
        days,
        total_chores,
        completed_chores,
    }
}

/// Stable pre-sort putting chores assigned to `user_id` first.
pub fn prioritize_user(chores: &mut [WeeklyChore], user_id: i64) {
    chores.sort_by_key(|wc| wc.chore.assigned_user_id != Some(user_id));
}

/// `(completed, total)` over (chore, scheduled day) pairs for a week.
///
/// An unscheduled chore counts once while untouched rather than seven
/// times, and once per day it was actually done.
#[must_use]
pub fn weekly_progress(chores: &[WeeklyChore], tz: &Tz) -> (usize, usize) {
    chores.iter().fold((0, 0), |(done, total), wc| {
        let configured = configured_days(&wc.chore);
        if configured.is_empty() {
            let n = completion_days(&wc.completions, tz).len();
            (done + n, total + n.max(1))
        } else {
            let hits = configured
                .iter()
                .filter(|d| resolve_day(&wc.chore, &wc.completions, *d, tz).is_completed)
                .count();
            (done + hits, total + configured.len())
        }
    })
}
