use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::db::{ChoreFields, CompletionFields, Database, UserFields};
use crate::error::{Error, Result};
use crate::models::{
    Chore, ChoreFilter, Completion, CompletionFilter, CompletionInfo, CompletionStats,
    CompletionTotals, DashboardStats, Frequency, Health, NewAdhocCompletion, NewChore,
    NewCompletion, NewUser, Page, UpdateChore, UpdateCompletion, UpdateUser, User, UserFilter,
    WeekGrid, WeeklyChore, WeeklyChores, validate_chore_name, validate_day_of_week,
    validate_email, validate_notes, validate_schedule, validate_user_name,
};
use crate::schedule::{build_week_grid, prioritize_user, weekly_progress};
use crate::week::{ensure_monday, local_date, local_noon, week_end, week_start};

const TOP_N: i64 = 5;
const RECENT_COMPLETIONS: i64 = 10;

/// Entry point for everything the CLI and the HTTP API do.
///
/// Holds the store and the household timezone, which decides what "today"
/// is and which weekday a completion lands on.
pub struct ChoreService {
    db: Database,
    tz: Tz,
}

impl ChoreService {
    pub fn new(db_path: &Path, tz: Tz) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db, tz })
    }

    pub fn new_in_memory(tz: Tz) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db, tz })
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        local_date(&Utc::now(), &self.tz)
    }

    #[must_use]
    pub fn current_week_start(&self) -> NaiveDate {
        week_start(self.today())
    }

    // --- Users ---

    pub fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        self.db.list_users(filter)
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.db.get_user(id)
    }

    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let fields = UserFields {
            name: validate_user_name(&new.name)?,
            email: validate_email(new.email.as_deref())?,
            is_admin: new.is_admin,
            is_active: new.is_active,
        };
        self.check_user_unique(&fields, None)?;
        let user = self.db.insert_user(&fields)?;
        info!(user_id = user.id, is_admin = user.is_admin, "user created");
        Ok(user)
    }

    pub fn update_user(&self, id: i64, update: &UpdateUser) -> Result<User> {
        let existing = self.db.get_user(id)?;
        let fields = UserFields {
            name: match &update.name {
                Some(name) => validate_user_name(name)?,
                None => existing.name.clone(),
            },
            email: match &update.email {
                Some(email) => validate_email(email.as_deref())?,
                None => existing.email.clone(),
            },
            is_admin: update.is_admin.unwrap_or(existing.is_admin),
            is_active: update.is_active.unwrap_or(existing.is_active),
        };
        self.check_user_unique(&fields, Some(id))?;

        let loses_admin = existing.is_admin
            && existing.is_active
            && !(fields.is_admin && fields.is_active);
        if loses_admin && self.db.count_active_admins()? <= 1 {
            return Err(Error::Integrity(
                "Cannot demote or deactivate the last active admin".to_string(),
            ));
        }

        let user = self.db.update_user(id, &fields)?;
        info!(user_id = id, "user updated");
        Ok(user)
    }

    /// Deletes a user. Chores they were assigned become unassigned; the
    /// completions they recorded stay, without a user.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        let existing = self.db.get_user(id)?;
        if existing.is_admin && existing.is_active && self.db.count_active_admins()? <= 1 {
            return Err(Error::Integrity(
                "Cannot delete the last active admin".to_string(),
            ));
        }
        self.db.delete_user(id)?;
        info!(user_id = id, "user deleted");
        Ok(())
    }

    fn check_user_unique(&self, fields: &UserFields, own_id: Option<i64>) -> Result<()> {
        if let Some(other) = self.db.find_user_by_name(&fields.name)? {
            if Some(other.id) != own_id {
                return Err(Error::Conflict(format!(
                    "A user named '{}' already exists",
                    fields.name
                )));
            }
        }
        if let Some(email) = &fields.email {
            if let Some(other) = self.db.find_user_by_email(email)? {
                if Some(other.id) != own_id {
                    return Err(Error::Conflict(format!(
                        "A user with email '{email}' already exists"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Make sure at least one active admin exists, creating or promoting
    /// `name` if not. Returns the admin and whether anything changed.
    pub fn ensure_admin(&self, name: &str, email: Option<&str>) -> Result<(User, bool)> {
        if self.db.count_active_admins()? > 0 {
            let admins = self.db.list_users(&UserFilter {
                is_active: Some(true),
                is_admin: Some(true),
                page: Page { skip: 0, limit: 1 },
            })?;
            if let Some(admin) = admins.into_iter().next() {
                return Ok((admin, false));
            }
        }

        let name = validate_user_name(name)?;
        if let Some(existing) = self.db.find_user_by_name(&name)? {
            let user = self.db.update_user(
                existing.id,
                &UserFields {
                    name: existing.name.clone(),
                    email: existing.email.clone(),
                    is_admin: true,
                    is_active: true,
                },
            )?;
            info!(user_id = user.id, "existing user promoted to admin");
            return Ok((user, true));
        }

        let user = self.create_user(&NewUser {
            name,
            email: email.map(str::to_string),
            is_admin: true,
            is_active: true,
        })?;
        Ok((user, true))
    }

    // --- Chores ---

    pub fn list_chores(&self, filter: &ChoreFilter) -> Result<Vec<Chore>> {
        self.db.list_chores(filter)
    }

    pub fn get_chore(&self, id: i64) -> Result<Chore> {
        self.db.get_chore(id)
    }

    pub fn create_chore(&self, new: &NewChore) -> Result<Chore> {
        let fields = ChoreFields {
            name: validate_chore_name(&new.name)?,
            description: clean_text(new.description.as_deref()),
            frequency: new.frequency,
            day_of_week: new.day_of_week.map(validate_day_of_week).transpose()?,
            day_of_week_2: new.day_of_week_2.map(validate_day_of_week).transpose()?,
            assigned_user_id: new.assigned_user_id,
            is_active: new.is_active,
            is_adhoc: new.is_adhoc,
        };
        self.check_chore(&fields)?;
        let chore = self.db.insert_chore(&fields)?;
        info!(chore_id = chore.id, frequency = %chore.frequency, "chore created");
        Ok(chore)
    }

    pub fn update_chore(&self, id: i64, update: &UpdateChore) -> Result<Chore> {
        let existing = self.db.get_chore(id)?;
        let frequency = update.frequency.unwrap_or(existing.frequency);
        let day_of_week_2 = match update.day_of_week_2 {
            Some(day) => day.map(validate_day_of_week).transpose()?,
            // Moving off twice_weekly drops the second day unless it was sent
            None if frequency != Frequency::TwiceWeekly => None,
            None => existing.day_of_week_2,
        };
        let fields = ChoreFields {
            name: match &update.name {
                Some(name) => validate_chore_name(name)?,
                None => existing.name.clone(),
            },
            description: match &update.description {
                Some(desc) => clean_text(desc.as_deref()),
                None => existing.description.clone(),
            },
            frequency,
            day_of_week: match update.day_of_week {
                Some(day) => day.map(validate_day_of_week).transpose()?,
                None => existing.day_of_week,
            },
            day_of_week_2,
            assigned_user_id: update.assigned_user_id.unwrap_or(existing.assigned_user_id),
            is_active: update.is_active.unwrap_or(existing.is_active),
            is_adhoc: existing.is_adhoc,
        };
        self.check_chore(&fields)?;
        let chore = self.db.update_chore(id, &fields)?;
        info!(chore_id = id, "chore updated");
        Ok(chore)
    }

    /// Deletes a chore and every completion recorded for it.
    pub fn delete_chore(&self, id: i64) -> Result<()> {
        if !self.db.delete_chore(id)? {
            return Err(Error::not_found("Chore", id));
        }
        info!(chore_id = id, "chore deleted");
        Ok(())
    }

    fn check_chore(&self, fields: &ChoreFields) -> Result<()> {
        validate_schedule(fields.frequency, fields.day_of_week, fields.day_of_week_2)?;
        if let Some(user_id) = fields.assigned_user_id {
            self.db.get_user(user_id)?;
        }
        Ok(())
    }

    // --- Weekly view ---

    /// Chores for the week starting `week_start` with their completions,
    /// ordered by name, case-insensitively. Frequency (daily first) only
    /// breaks ties between equal names.
    pub fn list_weekly_chores(
        &self,
        week_start: NaiveDate,
        user_id: Option<i64>,
        frequency: Option<Frequency>,
    ) -> Result<WeeklyChores> {
        ensure_monday(week_start)?;

        let mut by_chore: HashMap<i64, Vec<CompletionInfo>> = HashMap::new();
        for completion in self.db.completions_for_week(week_start)? {
            by_chore
                .entry(completion.chore_id)
                .or_default()
                .push(CompletionInfo::from(&completion));
        }

        let mut chores: Vec<WeeklyChore> = self
            .db
            .chores_for_week(week_start, user_id, frequency)?
            .into_iter()
            .map(|chore| {
                let completions = by_chore.remove(&chore.id).unwrap_or_default();
                WeeklyChore { chore, completions }
            })
            .collect();
        chores.sort_by_cached_key(|wc| (wc.chore.name.to_lowercase(), wc.chore.frequency.rank()));

        let (completed_chores, total_chores) = weekly_progress(&chores, &self.tz);
        debug!(
            %week_start,
            chores = chores.len(),
            completed_chores,
            total_chores,
            "weekly chores listed"
        );
        Ok(WeeklyChores {
            week_start,
            week_end: week_end(week_start),
            chores,
            total_chores,
            completed_chores,
        })
    }

    /// Lay the week out day by day. With `viewer_id`, that user's chores come
    /// first within each day.
    pub fn week_grid(
        &self,
        week_start: NaiveDate,
        user_id: Option<i64>,
        frequency: Option<Frequency>,
        viewer_id: Option<i64>,
    ) -> Result<WeekGrid> {
        let mut listing = self.list_weekly_chores(week_start, user_id, frequency)?;
        if let Some(viewer) = viewer_id {
            prioritize_user(&mut listing.chores, viewer);
        }
        Ok(build_week_grid(week_start, &listing.chores, &self.tz))
    }

    // --- Completions ---

    pub fn list_completions(&self, filter: &CompletionFilter) -> Result<Vec<Completion>> {
        self.db.list_completions(filter)
    }

    pub fn get_completion(&self, id: i64) -> Result<Completion> {
        self.db.get_completion(id)
    }

    pub fn mark_complete(&self, new: &NewCompletion) -> Result<Completion> {
        let chore = self.db.get_chore(new.chore_id)?;
        self.db.get_user(new.user_id)?;
        let mut fields = self.completion_fields(
            new.user_id,
            new.completion_date,
            new.week_start,
            new.notes.as_deref(),
        )?;
        fields.chore_id = chore.id;
        self.insert_completion(&chore, &fields)
    }

    /// Record a one-off chore, reusing an earlier one-off of the same name.
    pub fn record_adhoc(&self, new: &NewAdhocCompletion) -> Result<Completion> {
        let name = validate_chore_name(&new.name)?;
        self.db.get_user(new.user_id)?;
        let mut fields = self.completion_fields(
            new.user_id,
            new.completion_date,
            new.week_start,
            new.notes.as_deref(),
        )?;

        let chore = match self.db.find_adhoc_chore(&name)? {
            Some(chore) => chore,
            None => {
                let chore = self.db.insert_chore(&ChoreFields {
                    name,
                    description: clean_text(new.description.as_deref()),
                    frequency: Frequency::Weekly,
                    day_of_week: None,
                    day_of_week_2: None,
                    assigned_user_id: None,
                    is_active: false,
                    is_adhoc: true,
                })?;
                info!(chore_id = chore.id, "one-off chore created");
                chore
            }
        };
        fields.chore_id = chore.id;
        self.insert_completion(&chore, &fields)
    }

    pub fn adhoc_names(&self) -> Result<Vec<String>> {
        self.db.adhoc_names()
    }

    fn insert_completion(&self, chore: &Chore, fields: &CompletionFields) -> Result<Completion> {
        if self
            .db
            .find_completion_on(chore.id, fields.completed_on)?
            .is_some()
        {
            return Err(Error::Conflict(format!(
                "'{}' is already marked complete for {}",
                chore.name, fields.completed_on
            )));
        }
        let completion = self.db.insert_completion(fields)?;
        info!(
            completion_id = completion.id,
            chore_id = chore.id,
            user_id = ?fields.user_id,
            completed_on = %fields.completed_on,
            "chore marked complete"
        );
        Ok(completion)
    }

    /// Validate and stamp a new completion. `chore_id` is left for the caller.
    fn completion_fields(
        &self,
        user_id: i64,
        completion_date: Option<NaiveDate>,
        requested_week: Option<NaiveDate>,
        notes: Option<&str>,
    ) -> Result<CompletionFields> {
        let notes = validate_notes(notes)?;
        let now = Utc::now();
        let today = local_date(&now, &self.tz);

        let (completed_at, completed_on) = match completion_date {
            Some(date) if date > today => {
                return Err(Error::validation(format!(
                    "Cannot complete a chore for a future date ({date})"
                )));
            }
            Some(date) => (local_noon(date, &self.tz)?, date),
            None => (now, today),
        };

        let week = match requested_week {
            Some(ws) => {
                ensure_monday(ws)?;
                if week_start(completed_on) != ws {
                    return Err(Error::validation(format!(
                        "Completion date {completed_on} is not in the week starting {ws}"
                    )));
                }
                ws
            }
            None => week_start(completed_on),
        };

        Ok(CompletionFields {
            chore_id: 0,
            user_id: Some(user_id),
            completed_at,
            completed_on,
            week_start: week,
            notes,
        })
    }

    /// Undo a completion.
    pub fn delete_completion(&self, id: i64) -> Result<()> {
        if !self.db.delete_completion(id)? {
            return Err(Error::not_found("Completion", id));
        }
        info!(completion_id = id, "completion deleted");
        Ok(())
    }

    /// Change who did a completion, when, or its notes. Moving the timestamp
    /// also moves the completion to the week it now falls in.
    pub fn update_completion(&self, id: i64, update: &UpdateCompletion) -> Result<Completion> {
        let existing = self.db.get_completion(id)?;
        if let Some(user_id) = update.user_id {
            self.db.get_user(user_id)?;
        }

        let (completed_at, completed_on, week) = match update.completed_at {
            Some(ts) => {
                if ts > Utc::now() {
                    return Err(Error::validation(
                        "Cannot move a completion into the future",
                    ));
                }
                let day = local_date(&ts, &self.tz);
                (ts, day, week_start(day))
            }
            None => (existing.completed_at, existing.completed_on, existing.week_start),
        };

        if completed_on != existing.completed_on {
            if let Some(other) = self.db.find_completion_on(existing.chore_id, completed_on)? {
                if other.id != id {
                    return Err(Error::Conflict(format!(
                        "Chore {} is already marked complete for {completed_on}",
                        existing.chore_id
                    )));
                }
            }
        }

        let fields = CompletionFields {
            chore_id: existing.chore_id,
            user_id: update.user_id.or(existing.user_id),
            completed_at,
            completed_on,
            week_start: week,
            notes: match &update.notes {
                Some(notes) => validate_notes(notes.as_deref())?,
                None => existing.notes.clone(),
            },
        };
        let completion = self.db.update_completion(id, &fields)?;
        info!(completion_id = id, "completion updated");
        Ok(completion)
    }

    // --- Statistics ---

    pub fn completion_stats(&self, user_id: Option<i64>) -> Result<CompletionStats> {
        if let Some(id) = user_id {
            self.db.get_user(id)?;
        }
        let this_week = self.current_week_start();
        let completions_this_week = self.db.count_completions(user_id, Some(this_week))?;
        let active_chores = self.db.count_active_chores(user_id)?;

        Ok(CompletionStats {
            total_completions: self.db.count_completions(user_id, None)?,
            completions_this_week,
            active_chores,
            completion_rate: completion_rate(completions_this_week, active_chores),
            top_users: self.db.top_users(None, TOP_N)?,
            recent_completions: self.db.list_completions(&CompletionFilter {
                user_id,
                page: Page {
                    skip: 0,
                    limit: RECENT_COMPLETIONS,
                },
                ..CompletionFilter::default()
            })?,
        })
    }

    pub fn dashboard_stats(&self) -> Result<DashboardStats> {
        let this_week = self.current_week_start();
        let last_week = this_week - Duration::days(7);
        let chores = self.db.chore_totals()?;
        let completed_this_week = self.db.count_completions(None, Some(this_week))?;

        Ok(DashboardStats {
            week_start: this_week,
            users: self.db.user_totals()?,
            completions: CompletionTotals {
                total: self.db.count_completions(None, None)?,
                this_week: completed_this_week,
                last_week: self.db.count_completions(None, Some(last_week))?,
                completion_rate: completion_rate(completed_this_week, chores.active),
            },
            chores,
            top_users_this_week: self.db.top_users(Some(this_week), TOP_N)?,
            top_chores: self.db.top_chores(TOP_N)?,
            pending_chores: self.db.pending_chores(this_week, TOP_N)?,
        })
    }

    pub fn health(&self) -> Result<Health> {
        self.db.ping()?;
        Ok(Health {
            status: "healthy",
            database: "connected",
            timezone: self.tz.name().to_string(),
            users: self.db.count_users()?,
            chores: self.db.count_chores()?,
            completions: self.db.count_completions(None, None)?,
            timestamp: now_rfc3339(),
        })
    }
}

fn now_rfc3339() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.to_rfc3339()
}

/// Percentage rounded to two decimals, 0 when there is nothing to do.
#[allow(clippy::cast_precision_loss)]
fn completion_rate(done: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (done as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

fn clean_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc() -> ChoreService {
        ChoreService::new_in_memory(chrono_tz::UTC).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monday() -> NaiveDate {
        d(2024, 6, 3)
    }

    fn new_user(name: &str, is_admin: bool) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: None,
            is_admin,
            is_active: true,
        }
    }

    fn new_chore(name: &str, frequency: Frequency, day: Option<i64>) -> NewChore {
        NewChore {
            name: name.to_string(),
            description: None,
            frequency,
            day_of_week: day,
            day_of_week_2: None,
            assigned_user_id: None,
            is_active: true,
            is_adhoc: false,
        }
    }

    fn done(chore_id: i64, user_id: i64, on: NaiveDate) -> NewCompletion {
        NewCompletion {
            chore_id,
            user_id,
            week_start: None,
            completion_date: Some(on),
            notes: None,
        }
    }

    #[test]
    fn test_create_user_rejects_duplicate_name_and_email() {
        let s = svc();
        s.create_user(&NewUser {
            email: Some("sam@example.com".into()),
            ..new_user("Sam", false)
        })
        .unwrap();

        let err = s.create_user(&new_user(" Sam ", false)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = s
            .create_user(&NewUser {
                email: Some("sam@example.com".into()),
                ..new_user("Samuel", false)
            })
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_create_user_validates_input() {
        let s = svc();
        assert!(matches!(
            s.create_user(&new_user("", false)).unwrap_err(),
            Error::Validation(_)
        ));
        assert!(matches!(
            s.create_user(&NewUser {
                email: Some("not-an-email".into()),
                ..new_user("Kim", false)
            })
            .unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn test_update_user_keeps_own_name() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let updated = s
            .update_user(
                sam.id,
                &UpdateUser {
                    name: Some("Sam".into()),
                    email: Some(Some("sam@example.com".into())),
                    ..UpdateUser::default()
                },
            )
            .unwrap();
        assert_eq!(updated.email.as_deref(), Some("sam@example.com"));

        let cleared = s
            .update_user(
                sam.id,
                &UpdateUser {
                    email: Some(None),
                    ..UpdateUser::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.email, None);
    }

    #[test]
    fn test_last_admin_is_protected() {
        let s = svc();
        let admin = s.create_user(&new_user("Admin", true)).unwrap();

        let err = s.delete_user(admin.id).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));

        let err = s
            .update_user(
                admin.id,
                &UpdateUser {
                    is_admin: Some(false),
                    ..UpdateUser::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));

        let err = s
            .update_user(
                admin.id,
                &UpdateUser {
                    is_active: Some(false),
                    ..UpdateUser::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));

        // with a second admin around, the first may go
        s.create_user(&new_user("Backup", true)).unwrap();
        s.delete_user(admin.id).unwrap();
        assert!(matches!(
            s.get_user(admin.id).unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[test]
    fn test_delete_user_keeps_their_completed_chores_done() {
        let s = svc();
        s.create_user(&new_user("Admin", true)).unwrap();
        let kim = s.create_user(&new_user("Kim", false)).unwrap();
        let chore = s
            .create_chore(&NewChore {
                assigned_user_id: Some(kim.id),
                ..new_chore("Trash", Frequency::Weekly, Some(1))
            })
            .unwrap();
        let completion = s.mark_complete(&done(chore.id, kim.id, d(2024, 6, 4))).unwrap();

        s.delete_user(kim.id).unwrap();
        assert_eq!(s.get_chore(chore.id).unwrap().assigned_user_id, None);

        let kept = s.get_completion(completion.id).unwrap();
        assert_eq!(kept.user_id, None);

        let grid = s.week_grid(monday(), None, None, None).unwrap();
        let tuesday = &grid.days[1].instances[0];
        assert!(tuesday.is_completed);
        let info = tuesday.completion.as_ref().unwrap();
        assert_eq!(info.completion_id, completion.id);
        assert_eq!(info.completed_by, None);
        assert_eq!(info.completed_by_name, None);

        let listing = s.list_weekly_chores(monday(), None, None).unwrap();
        assert_eq!((listing.completed_chores, listing.total_chores), (1, 1));
    }

    #[test]
    fn test_ensure_admin_is_idempotent() {
        let s = svc();
        let (admin, created) = s.ensure_admin("Admin", Some("admin@example.com")).unwrap();
        assert!(created);
        assert!(admin.is_admin);
        let (again, created) = s.ensure_admin("Someone Else", None).unwrap();
        assert!(!created);
        assert_eq!(again.id, admin.id);
    }

    #[test]
    fn test_ensure_admin_promotes_existing_user() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let (admin, created) = s.ensure_admin("Sam", None).unwrap();
        assert!(created);
        assert_eq!(admin.id, sam.id);
        assert!(admin.is_admin);
    }

    #[test]
    fn test_create_chore_validates_schedule() {
        let s = svc();
        let err = s
            .create_chore(&new_chore("Mop", Frequency::Weekly, Some(9)))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = s
            .create_chore(&NewChore {
                day_of_week_2: Some(3),
                ..new_chore("Mop", Frequency::Weekly, Some(1))
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = s
            .create_chore(&NewChore {
                assigned_user_id: Some(42),
                ..new_chore("Mop", Frequency::Weekly, Some(1))
            })
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "User", id: 42 }));
    }

    #[test]
    fn test_update_chore_off_twice_weekly_drops_second_day() {
        let s = svc();
        let chore = s
            .create_chore(&NewChore {
                day_of_week_2: Some(4),
                ..new_chore("Laundry", Frequency::TwiceWeekly, Some(0))
            })
            .unwrap();
        let updated = s
            .update_chore(
                chore.id,
                &UpdateChore {
                    frequency: Some(Frequency::Weekly),
                    ..UpdateChore::default()
                },
            )
            .unwrap();
        assert_eq!(updated.frequency, Frequency::Weekly);
        assert_eq!(updated.day_of_week, Some(0));
        assert_eq!(updated.day_of_week_2, None);

        let cleared = s
            .update_chore(
                chore.id,
                &UpdateChore {
                    day_of_week: Some(None),
                    description: Some(Some("  ".into())),
                    ..UpdateChore::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.day_of_week, None);
        assert_eq!(cleared.description, None);
    }

    #[test]
    fn test_delete_missing_chore_is_not_found() {
        let s = svc();
        assert!(matches!(
            s.delete_chore(7).unwrap_err(),
            Error::NotFound { entity: "Chore", id: 7 }
        ));
    }

    #[test]
    fn test_mark_complete_stamps_local_noon() {
        let s = ChoreService::new_in_memory(chrono_tz::America::New_York).unwrap();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let chore = s.create_chore(&new_chore("Dishes", Frequency::Daily, None)).unwrap();
        let c = s.mark_complete(&done(chore.id, sam.id, d(2024, 6, 9))).unwrap();
        assert_eq!(c.completed_on, d(2024, 6, 9));
        assert_eq!(c.week_start, monday());
        assert_eq!(c.completed_at.to_rfc3339(), "2024-06-09T16:00:00+00:00");
    }

    #[test]
    fn test_mark_complete_rejects_bad_weeks_and_dates() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let chore = s.create_chore(&new_chore("Dishes", Frequency::Daily, None)).unwrap();

        let not_monday = NewCompletion {
            week_start: Some(d(2024, 6, 4)),
            ..done(chore.id, sam.id, d(2024, 6, 4))
        };
        assert!(matches!(
            s.mark_complete(&not_monday).unwrap_err(),
            Error::Validation(_)
        ));

        let wrong_week = NewCompletion {
            week_start: Some(d(2024, 6, 10)),
            ..done(chore.id, sam.id, d(2024, 6, 4))
        };
        assert!(matches!(
            s.mark_complete(&wrong_week).unwrap_err(),
            Error::Validation(_)
        ));

        let tomorrow = s.today() + Duration::days(1);
        assert!(matches!(
            s.mark_complete(&done(chore.id, sam.id, tomorrow)).unwrap_err(),
            Error::Validation(_)
        ));

        assert!(matches!(
            s.mark_complete(&done(999, sam.id, d(2024, 6, 4))).unwrap_err(),
            Error::NotFound { entity: "Chore", .. }
        ));
        assert!(matches!(
            s.mark_complete(&done(chore.id, 999, d(2024, 6, 4))).unwrap_err(),
            Error::NotFound { entity: "User", .. }
        ));
    }

    #[test]
    fn test_mark_complete_without_date_uses_today() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let chore = s.create_chore(&new_chore("Dishes", Frequency::Daily, None)).unwrap();
        let c = s
            .mark_complete(&NewCompletion {
                completion_date: None,
                ..done(chore.id, sam.id, monday())
            })
            .unwrap();
        assert_eq!(c.completed_on, s.today());
        assert_eq!(c.week_start, s.current_week_start());
    }

    #[test]
    fn test_second_completion_same_day_is_conflict() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let chore = s.create_chore(&new_chore("Dishes", Frequency::Daily, None)).unwrap();
        s.mark_complete(&done(chore.id, sam.id, d(2024, 6, 4))).unwrap();
        let err = s
            .mark_complete(&done(chore.id, sam.id, d(2024, 6, 4)))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_mark_complete_then_undo_round_trip() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let chore = s
            .create_chore(&new_chore("Vacuum", Frequency::Weekly, Some(2)))
            .unwrap();

        let c = s.mark_complete(&done(chore.id, sam.id, d(2024, 6, 5))).unwrap();
        let grid = s.week_grid(monday(), None, None, None).unwrap();
        let wednesday = &grid.days[2].instances[0];
        assert!(wednesday.is_completed);
        assert_eq!(wednesday.completion.as_ref().unwrap().completion_id, c.id);

        s.delete_completion(c.id).unwrap();
        let grid = s.week_grid(monday(), None, None, None).unwrap();
        let wednesday = &grid.days[2].instances[0];
        assert!(!wednesday.is_completed);
        assert!(wednesday.completion.is_none());

        assert!(matches!(
            s.delete_completion(c.id).unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[test]
    fn test_list_weekly_chores_sorts_and_counts() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let laundry = s
            .create_chore(&NewChore {
                day_of_week_2: Some(4),
                ..new_chore("Laundry", Frequency::TwiceWeekly, Some(0))
            })
            .unwrap();
        s.create_chore(&new_chore("trash", Frequency::Weekly, Some(1))).unwrap();
        s.create_chore(&new_chore("Bins", Frequency::Weekly, Some(3))).unwrap();
        let dishes = s.create_chore(&new_chore("Dishes", Frequency::Daily, None)).unwrap();
        s.create_chore(&NewChore {
            is_active: false,
            ..new_chore("Paused", Frequency::Daily, None)
        })
        .unwrap();

        s.mark_complete(&done(laundry.id, sam.id, d(2024, 6, 7))).unwrap();
        s.mark_complete(&done(dishes.id, sam.id, d(2024, 6, 3))).unwrap();
        s.mark_complete(&done(dishes.id, sam.id, d(2024, 6, 4))).unwrap();
        // a different week does not leak in
        s.mark_complete(&done(dishes.id, sam.id, d(2024, 6, 10))).unwrap();

        let week = s.list_weekly_chores(monday(), None, None).unwrap();
        let names: Vec<_> = week.chores.iter().map(|wc| wc.chore.name.as_str()).collect();
        assert_eq!(names, vec!["Bins", "Dishes", "Laundry", "trash"]);
        assert_eq!(week.week_end, d(2024, 6, 9));
        assert_eq!(week.chores[1].completions.len(), 2);
        // laundry 1 of 2, bins 0 of 1, trash 0 of 1, dishes 2 of 2
        assert_eq!((week.completed_chores, week.total_chores), (3, 6));
    }

    #[test]
    fn test_weekly_order_is_by_name_before_frequency() {
        let s = svc();
        s.create_chore(&new_chore("Zucchini patch", Frequency::Daily, None))
            .unwrap();
        s.create_chore(&new_chore("Apple tree", Frequency::Weekly, Some(0)))
            .unwrap();
        s.create_chore(&new_chore("apple tree", Frequency::Daily, None))
            .unwrap();

        let week = s.list_weekly_chores(monday(), None, None).unwrap();
        let listed: Vec<_> = week
            .chores
            .iter()
            .map(|wc| (wc.chore.name.as_str(), wc.chore.frequency))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("apple tree", Frequency::Daily),
                ("Apple tree", Frequency::Weekly),
                ("Zucchini patch", Frequency::Daily),
            ]
        );

        let grid = s.week_grid(monday(), None, None, None).unwrap();
        let monday_names: Vec<_> = grid.days[0]
            .instances
            .iter()
            .map(|i| i.chore.name.as_str())
            .collect();
        assert_eq!(monday_names, vec!["apple tree", "Apple tree", "Zucchini patch"]);
    }

    #[test]
    fn test_list_weekly_chores_rejects_non_monday() {
        let s = svc();
        assert!(matches!(
            s.list_weekly_chores(d(2024, 6, 5), None, None).unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn test_list_weekly_chores_filters() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        s.create_chore(&NewChore {
            assigned_user_id: Some(sam.id),
            ..new_chore("Dishes", Frequency::Daily, None)
        })
        .unwrap();
        s.create_chore(&new_chore("Trash", Frequency::Weekly, Some(1))).unwrap();

        let mine = s.list_weekly_chores(monday(), Some(sam.id), None).unwrap();
        assert_eq!(mine.chores.len(), 1);
        assert_eq!(mine.chores[0].chore.name, "Dishes");

        let weekly = s
            .list_weekly_chores(monday(), None, Some(Frequency::Weekly))
            .unwrap();
        assert_eq!(weekly.chores.len(), 1);
        assert_eq!(weekly.chores[0].chore.name, "Trash");
    }

    #[test]
    fn test_week_grid_puts_viewer_chores_first() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let kim = s.create_user(&new_user("Kim", false)).unwrap();
        s.create_chore(&NewChore {
            assigned_user_id: Some(sam.id),
            ..new_chore("Alpha", Frequency::Weekly, Some(0))
        })
        .unwrap();
        s.create_chore(&NewChore {
            assigned_user_id: Some(kim.id),
            ..new_chore("Beta", Frequency::Weekly, Some(0))
        })
        .unwrap();

        let grid = s.week_grid(monday(), None, None, Some(kim.id)).unwrap();
        let order: Vec<_> = grid.days[0]
            .instances
            .iter()
            .map(|i| i.chore.name.as_str())
            .collect();
        assert_eq!(order, vec!["Beta", "Alpha"]);
    }

    #[test]
    fn test_record_adhoc_reuses_chore_and_shows_in_week() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let adhoc = |date| NewAdhocCompletion {
            name: "Clean gutters".into(),
            description: None,
            user_id: sam.id,
            completion_date: Some(date),
            week_start: None,
            notes: None,
        };

        let first = s.record_adhoc(&adhoc(d(2024, 6, 5))).unwrap();
        let second = s.record_adhoc(&adhoc(d(2024, 6, 12))).unwrap();
        assert_eq!(first.chore_id, second.chore_id);

        let chore = s.get_chore(first.chore_id).unwrap();
        assert!(chore.is_adhoc);
        assert!(!chore.is_active);
        assert_eq!(s.adhoc_names().unwrap(), vec!["Clean gutters"]);

        let grid = s.week_grid(monday(), None, None, None).unwrap();
        let days: Vec<u8> = grid
            .days
            .iter()
            .filter(|b| !b.instances.is_empty())
            .map(|b| b.day_of_week)
            .collect();
        assert_eq!(days, vec![2]);

        // assigned-user filter drops one-off chores
        let mine = s.list_weekly_chores(monday(), Some(sam.id), None).unwrap();
        assert!(mine.chores.is_empty());
    }

    #[test]
    fn test_record_adhoc_future_date_creates_nothing() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let err = s
            .record_adhoc(&NewAdhocCompletion {
                name: "Paint fence".into(),
                description: None,
                user_id: sam.id,
                completion_date: Some(s.today() + Duration::days(2)),
                week_start: None,
                notes: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(s.adhoc_names().unwrap().is_empty());
    }

    #[test]
    fn test_update_completion_moves_week_and_checks_conflicts() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let kim = s.create_user(&new_user("Kim", false)).unwrap();
        let chore = s.create_chore(&new_chore("Dishes", Frequency::Daily, None)).unwrap();
        let a = s.mark_complete(&done(chore.id, sam.id, d(2024, 6, 4))).unwrap();
        s.mark_complete(&done(chore.id, sam.id, d(2024, 6, 5))).unwrap();

        let moved = s
            .update_completion(
                a.id,
                &UpdateCompletion {
                    user_id: Some(kim.id),
                    completed_at: Some(local_noon(d(2024, 6, 10), &chrono_tz::UTC).unwrap()),
                    notes: Some(Some("late".into())),
                },
            )
            .unwrap();
        assert_eq!(moved.user_id, Some(kim.id));
        assert_eq!(moved.week_start, d(2024, 6, 10));
        assert_eq!(moved.notes.as_deref(), Some("late"));

        let err = s
            .update_completion(
                a.id,
                &UpdateCompletion {
                    completed_at: Some(local_noon(d(2024, 6, 5), &chrono_tz::UTC).unwrap()),
                    ..UpdateCompletion::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_completion_stats() {
        let s = svc();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let a = s
            .create_chore(&NewChore {
                assigned_user_id: Some(sam.id),
                ..new_chore("Dishes", Frequency::Daily, None)
            })
            .unwrap();
        s.create_chore(&NewChore {
            assigned_user_id: Some(sam.id),
            ..new_chore("Trash", Frequency::Weekly, Some(1))
        })
        .unwrap();
        s.create_chore(&new_chore("Mop", Frequency::Weekly, Some(2))).unwrap();
        s.mark_complete(&NewCompletion {
            completion_date: None,
            ..done(a.id, sam.id, monday())
        })
        .unwrap();
        s.mark_complete(&done(a.id, sam.id, d(2024, 6, 4))).unwrap();

        let all = s.completion_stats(None).unwrap();
        assert_eq!(all.total_completions, 2);
        assert_eq!(all.completions_this_week, 1);
        assert_eq!(all.active_chores, 3);
        assert!((all.completion_rate - 33.33).abs() < f64::EPSILON);
        assert_eq!(all.top_users[0].count, 2);
        assert_eq!(all.recent_completions.len(), 2);

        let mine = s.completion_stats(Some(sam.id)).unwrap();
        assert_eq!(mine.active_chores, 2);
        assert!((mine.completion_rate - 50.0).abs() < f64::EPSILON);

        assert!(matches!(
            s.completion_stats(Some(99)).unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[test]
    fn test_dashboard_stats() {
        let s = svc();
        s.create_user(&new_user("Admin", true)).unwrap();
        let sam = s.create_user(&new_user("Sam", false)).unwrap();
        let dishes = s.create_chore(&new_chore("Dishes", Frequency::Daily, None)).unwrap();
        s.create_chore(&new_chore("Trash", Frequency::Weekly, Some(1))).unwrap();
        s.mark_complete(&NewCompletion {
            completion_date: None,
            ..done(dishes.id, sam.id, monday())
        })
        .unwrap();

        let stats = s.dashboard_stats().unwrap();
        assert_eq!(stats.week_start, s.current_week_start());
        assert_eq!(stats.users.total, 2);
        assert_eq!(stats.users.admins, 1);
        assert_eq!(stats.chores.active, 2);
        assert_eq!(stats.completions.this_week, 1);
        assert_eq!(stats.completions.last_week, 0);
        assert!((stats.completions.completion_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.top_users_this_week[0].name, "Sam");
        assert_eq!(stats.pending_chores.len(), 1);
        assert_eq!(stats.pending_chores[0].name, "Trash");
    }

    #[test]
    fn test_health() {
        let s = svc();
        s.create_user(&new_user("Admin", true)).unwrap();
        let h = s.health().unwrap();
        assert_eq!(h.status, "healthy");
        assert_eq!(h.timezone, "UTC");
        assert_eq!(h.users, 1);
    }

    #[test]
    fn test_completion_rate_rounding() {
        assert!((completion_rate(1, 3) - 33.33).abs() < f64::EPSILON);
        assert!((completion_rate(2, 3) - 66.67).abs() < f64::EPSILON);
        assert!(completion_rate(5, 0).abs() < f64::EPSILON);
    }
}
