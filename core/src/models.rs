use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    TwiceWeekly,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Self::Daily, Self::Weekly, Self::TwiceWeekly];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::TwiceWeekly => "twice_weekly",
        }
    }

    /// Sort rank used when listing a week: daily chores first.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 2,
            Self::TwiceWeekly => 3,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "twice_weekly" => Ok(Self::TwiceWeekly),
            _ => Err(Error::validation(format!(
                "Invalid frequency '{s}'. Must be one of: daily, weekly, twice_weekly"
            ))),
        }
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse().map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub email: Option<Option<String>>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chore {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub day_of_week: Option<u8>,
    pub day_of_week_2: Option<u8>,
    pub assigned_user_id: Option<i64>,
    // Joined for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_name: Option<String>,
    pub is_active: bool,
    pub is_adhoc: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChore {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: Frequency,
    #[serde(default)]
    pub day_of_week: Option<i64>,
    #[serde(default)]
    pub day_of_week_2: Option<i64>,
    #[serde(default)]
    pub assigned_user_id: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(skip)]
    pub is_adhoc: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChore {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub day_of_week: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub day_of_week_2: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_user_id: Option<Option<i64>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Completion {
    pub id: i64,
    pub chore_id: i64,
    /// `None` once the user who did it has been removed.
    pub user_id: Option<i64>,
    pub completed_at: DateTime<Utc>,
    /// Calendar day of `completed_at` in the household timezone.
    pub completed_on: NaiveDate,
    pub week_start: NaiveDate,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chore_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompletion {
    pub chore_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub week_start: Option<NaiveDate>,
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompletion {
    pub user_id: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

/// A one-off chore done outside the schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdhocCompletion {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub user_id: i64,
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub week_start: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The slice of a completion the weekly views carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionInfo {
    pub completion_id: i64,
    pub completed_at: DateTime<Utc>,
    pub completed_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by_name: Option<String>,
    pub notes: Option<String>,
}

impl From<&Completion> for CompletionInfo {
    fn from(c: &Completion) -> Self {
        Self {
            completion_id: c.id,
            completed_at: c.completed_at,
            completed_by: c.user_id,
            completed_by_name: c.user_name.clone(),
            notes: c.notes.clone(),
        }
    }
}

/// A chore together with the completions recorded for one week.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeeklyChore {
    #[serde(flatten)]
    pub chore: Chore,
    pub completions: Vec<CompletionInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyChores {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub chores: Vec<WeeklyChore>,
    pub total_chores: usize,
    pub completed_chores: usize,
}

/// One chore as it appears on one day of the week grid.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayInstance {
    #[serde(flatten)]
    pub chore: Chore,
    pub is_completed: bool,
    #[serde(flatten)]
    pub completion: Option<CompletionInfo>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub day_of_week: u8,
    pub name: &'static str,
    pub instances: Vec<DayInstance>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeekGrid {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub label: String,
    pub days: Vec<DayBucket>,
    /// Same counting as [`WeeklyChores`]: scheduled (chore, day) pairs, with
    /// an untouched unscheduled chore counted once.
    pub total_chores: usize,
    pub completed_chores: usize,
}

// --- Listing filters ---

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Result<Self> {
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if skip < 0 {
            return Err(Error::validation("skip must be 0 or greater"));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(Error::validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(Self { skip, limit })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub page: Page,
}

#[derive(Debug, Clone, Default)]
pub struct ChoreFilter {
    pub is_active: Option<bool>,
    pub assigned_user_id: Option<i64>,
    pub frequency: Option<Frequency>,
    pub include_adhoc: bool,
    pub page: Page,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionFilter {
    pub chore_id: Option<i64>,
    pub user_id: Option<i64>,
    pub week_start: Option<NaiveDate>,
    pub page: Page,
}

// --- Statistics ---

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserCount {
    pub user_id: i64,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChoreCount {
    pub chore_id: i64,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionStats {
    pub total_completions: i64,
    pub completions_this_week: i64,
    pub active_chores: i64,
    pub completion_rate: f64,
    pub top_users: Vec<UserCount>,
    pub recent_completions: Vec<Completion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserTotals {
    pub total: i64,
    pub active: i64,
    pub admins: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoreTotals {
    pub total: i64,
    pub active: i64,
    pub unassigned: i64,
    pub daily: i64,
    pub weekly: i64,
    pub twice_weekly: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionTotals {
    pub total: i64,
    pub this_week: i64,
    pub last_week: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub week_start: NaiveDate,
    pub users: UserTotals,
    pub chores: ChoreTotals,
    pub completions: CompletionTotals,
    pub top_users_this_week: Vec<UserCount>,
    pub top_chores: Vec<ChoreCount>,
    pub pending_chores: Vec<Chore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: &'static str,
    pub timezone: String,
    pub users: i64,
    pub chores: i64,
    pub completions: i64,
    pub timestamp: String,
}

// --- Validation ---

pub const MAX_USER_NAME: usize = 100;
pub const MAX_EMAIL: usize = 255;
pub const MAX_CHORE_NAME: usize = 200;
pub const MAX_NOTES: usize = 1000;

fn default_true() -> bool {
    true
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
#[allow(clippy::option_option)]
pub fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn validate_name(field: &str, name: &str, max: usize) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(Error::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_user_name(name: &str) -> Result<String> {
    validate_name("User name", name, MAX_USER_NAME)
}

pub fn validate_chore_name(name: &str) -> Result<String> {
    validate_name("Chore name", name, MAX_CHORE_NAME)
}

/// Blank addresses normalize to `None`.
pub fn validate_email(email: Option<&str>) -> Result<Option<String>> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    if email.chars().count() > MAX_EMAIL {
        return Err(Error::validation(format!(
            "Email must be at most {MAX_EMAIL} characters"
        )));
    }
    let mut parts = email.split('@');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    );
    if !valid || email.contains(char::is_whitespace) {
        return Err(Error::validation(format!("Invalid email address '{email}'")));
    }
    Ok(Some(email.to_string()))
}

pub fn validate_day_of_week(day: i64) -> Result<u8> {
    u8::try_from(day)
        .ok()
        .filter(|d| *d <= 6)
        .ok_or_else(|| {
            Error::validation(format!(
                "day_of_week must be between 0 (Monday) and 6 (Sunday), got {day}"
            ))
        })
}

/// Check that the configured days make sense for `frequency`.
pub fn validate_schedule(
    frequency: Frequency,
    day_of_week: Option<u8>,
    day_of_week_2: Option<u8>,
) -> Result<()> {
    for day in [day_of_week, day_of_week_2].into_iter().flatten() {
        validate_day_of_week(i64::from(day))?;
    }
    if frequency != Frequency::TwiceWeekly && day_of_week_2.is_some() {
        return Err(Error::validation(
            "day_of_week_2 is only allowed for twice_weekly chores",
        ));
    }
    if frequency == Frequency::TwiceWeekly
        && day_of_week.is_some()
        && day_of_week == day_of_week_2
    {
        return Err(Error::validation(
            "A twice_weekly chore needs two different days",
        ));
    }
    Ok(())
}

/// Blank notes normalize to `None`.
pub fn validate_notes(notes: Option<&str>) -> Result<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if notes.chars().count() > MAX_NOTES {
        return Err(Error::validation(format!(
            "Notes must be at most {MAX_NOTES} characters"
        )));
    }
    Ok(Some(notes.to_string()))
}
