use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Error, Result};
use crate::models::{
    Chore, ChoreCount, ChoreFilter, ChoreTotals, Completion, CompletionFilter, Frequency, User,
    UserCount, UserFilter, UserTotals,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const CHORE_SELECT: &str = "SELECT c.id, c.name, c.description, c.frequency, c.day_of_week,
        c.day_of_week_2, c.assigned_user_id, u.name, c.is_active, c.is_adhoc,
        c.created_at, c.updated_at
     FROM chores c
     LEFT JOIN users u ON u.id = c.assigned_user_id";

const COMPLETION_SELECT: &str = "SELECT x.id, x.chore_id, x.user_id, x.completed_at,
        x.completed_on, x.week_start, x.notes, c.name, u.name
     FROM completions x
     JOIN chores c ON c.id = x.chore_id
     LEFT JOIN users u ON u.id = x.user_id";

const SCHEMA_V1: &str = "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        email TEXT UNIQUE,
        is_admin INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        frequency TEXT NOT NULL
            CHECK (frequency IN ('daily', 'weekly', 'twice_weekly')),
        day_of_week INTEGER CHECK (day_of_week BETWEEN 0 AND 6),
        day_of_week_2 INTEGER CHECK (day_of_week_2 BETWEEN 0 AND 6),
        assigned_user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        is_adhoc INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS completions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chore_id INTEGER NOT NULL REFERENCES chores(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        completed_at TEXT NOT NULL,
        completed_on TEXT NOT NULL,
        week_start TEXT NOT NULL,
        notes TEXT,
        UNIQUE (chore_id, completed_on)
    );

    CREATE INDEX IF NOT EXISTS idx_chores_assigned ON chores(assigned_user_id);
    CREATE INDEX IF NOT EXISTS idx_completions_week ON completions(week_start);
    CREATE INDEX IF NOT EXISTS idx_completions_chore ON completions(chore_id);
    CREATE INDEX IF NOT EXISTS idx_completions_user ON completions(user_id);

    PRAGMA user_version = 1;";

/// Column values for inserting or rewriting a user row.
#[derive(Debug, Clone)]
pub struct UserFields {
    pub name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
}

/// Column values for inserting or rewriting a chore row. Days are already
/// validated.
#[derive(Debug, Clone)]
pub struct ChoreFields {
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub day_of_week: Option<u8>,
    pub day_of_week_2: Option<u8>,
    pub assigned_user_id: Option<i64>,
    pub is_active: bool,
    pub is_adhoc: bool,
}

#[derive(Debug, Clone)]
pub struct CompletionFields {
    pub chore_id: i64,
    pub user_id: Option<i64>,
    pub completed_at: DateTime<Utc>,
    pub completed_on: NaiveDate,
    pub week_start: NaiveDate,
    pub notes: Option<String>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(SCHEMA_V1)?;
        }

        if version < 2 {
            // Completions outlive the user who recorded them.
            self.conn.execute_batch(
                "BEGIN;
                 CREATE TABLE completions_new (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chore_id INTEGER NOT NULL REFERENCES chores(id) ON DELETE CASCADE,
                    user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                    completed_at TEXT NOT NULL,
                    completed_on TEXT NOT NULL,
                    week_start TEXT NOT NULL,
                    notes TEXT,
                    UNIQUE (chore_id, completed_on)
                 );

                 INSERT INTO completions_new (id, chore_id, user_id, completed_at, completed_on,
                                              week_start, notes)
                 SELECT id, chore_id, user_id, completed_at, completed_on, week_start, notes
                 FROM completions;

                 DROP TABLE completions;
                 ALTER TABLE completions_new RENAME TO completions;

                 CREATE INDEX IF NOT EXISTS idx_completions_week ON completions(week_start);
                 CREATE INDEX IF NOT EXISTS idx_completions_chore ON completions(chore_id);
                 CREATE INDEX IF NOT EXISTS idx_completions_user ON completions(user_id);

                 PRAGMA user_version = 2;
                 COMMIT;",
            )?;
        }

        Ok(())
    }

    pub fn ping(&self) -> Result<()> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    // --- Row mapping helpers ---

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            is_admin: row.get(3)?,
            is_active: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // Expects the columns of CHORE_SELECT
    fn chore_from_row(row: &rusqlite::Row) -> rusqlite::Result<Chore> {
        Ok(Chore {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            frequency: row.get(3)?,
            day_of_week: row.get(4)?,
            day_of_week_2: row.get(5)?,
            assigned_user_id: row.get(6)?,
            assigned_user_name: row.get(7)?,
            is_active: row.get(8)?,
            is_adhoc: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    // Expects the columns of COMPLETION_SELECT
    fn completion_from_row(row: &rusqlite::Row) -> rusqlite::Result<Completion> {
        Ok(Completion {
            id: row.get(0)?,
            chore_id: row.get(1)?,
            user_id: row.get(2)?,
            completed_at: timestamp_column(row, 3)?,
            completed_on: date_column(row, 4)?,
            week_start: date_column(row, 5)?,
            notes: row.get(6)?,
            chore_name: row.get(7)?,
            user_name: row.get(8)?,
        })
    }

    // --- Users ---

    pub fn insert_user(&self, user: &UserFields) -> Result<User> {
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO users (name, email, is_admin, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![user.name, user.email, user.is_admin, user.is_active, now, now],
            )
            .map_err(|e| unique_conflict(e, "A user with that name or email already exists"))?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.find_user(id)?.ok_or_else(|| Error::not_found("User", id))
    }

    pub fn find_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, email, is_admin, is_active, created_at, updated_at
                 FROM users WHERE id = ?1",
                params![id],
                Self::user_from_row,
            )
            .optional()?)
    }

    pub fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, email, is_admin, is_active, created_at, updated_at
                 FROM users WHERE name = ?1",
                params![name],
                Self::user_from_row,
            )
            .optional()?)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, email, is_admin, is_active, created_at, updated_at
                 FROM users WHERE email = ?1",
                params![email],
                Self::user_from_row,
            )
            .optional()?)
    }

    pub fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, is_admin, is_active, created_at, updated_at
             FROM users
             WHERE (?1 IS NULL OR is_active = ?1)
               AND (?2 IS NULL OR is_admin = ?2)
             ORDER BY name COLLATE NOCASE, id
             LIMIT ?3 OFFSET ?4",
        )?;
        let users = stmt
            .query_map(
                params![
                    filter.is_active,
                    filter.is_admin,
                    filter.page.limit,
                    filter.page.skip
                ],
                Self::user_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn update_user(&self, id: i64, user: &UserFields) -> Result<User> {
        let now = Local::now().to_rfc3339();
        let rows = self
            .conn
            .execute(
                "UPDATE users SET name = ?1, email = ?2, is_admin = ?3, is_active = ?4,
                        updated_at = ?5
                 WHERE id = ?6",
                params![user.name, user.email, user.is_admin, user.is_active, now, id],
            )
            .map_err(|e| unique_conflict(e, "A user with that name or email already exists"))?;
        if rows == 0 {
            return Err(Error::not_found("User", id));
        }
        self.get_user(id)
    }

    /// Removes the user. Their chores become unassigned and their completions
    /// stay, with no user attached.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn count_active_admins(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_admin = 1 AND is_active = 1",
            [],
            |row| row.get(0),
        )?)
    }

    // --- Chores ---

    pub fn insert_chore(&self, chore: &ChoreFields) -> Result<Chore> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO chores (name, description, frequency, day_of_week, day_of_week_2,
                                 assigned_user_id, is_active, is_adhoc, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                chore.name,
                chore.description,
                chore.frequency,
                chore.day_of_week,
                chore.day_of_week_2,
                chore.assigned_user_id,
                chore.is_active,
                chore.is_adhoc,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_chore(id)
    }

    pub fn get_chore(&self, id: i64) -> Result<Chore> {
        self.find_chore(id)?
            .ok_or_else(|| Error::not_found("Chore", id))
    }

    pub fn find_chore(&self, id: i64) -> Result<Option<Chore>> {
        Ok(self
            .conn
            .query_row(
                &format!("{CHORE_SELECT} WHERE c.id = ?1"),
                params![id],
                Self::chore_from_row,
            )
            .optional()?)
    }

    pub fn list_chores(&self, filter: &ChoreFilter) -> Result<Vec<Chore>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHORE_SELECT}
             WHERE (?1 IS NULL OR c.is_active = ?1)
               AND (?2 IS NULL OR c.assigned_user_id = ?2)
               AND (?3 IS NULL OR c.frequency = ?3)
               AND (?4 = 1 OR c.is_adhoc = 0)
             ORDER BY c.name COLLATE NOCASE, c.id
             LIMIT ?5 OFFSET ?6"
        ))?;
        let chores = stmt
            .query_map(
                params![
                    filter.is_active,
                    filter.assigned_user_id,
                    filter.frequency,
                    filter.include_adhoc,
                    filter.page.limit,
                    filter.page.skip,
                ],
                Self::chore_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chores)
    }

    /// Chores to show for a week: every active chore matching the filters,
    /// plus inactive one-off chores that were done that week.
    ///
    /// One-off chores are never assigned, so a user filter drops them. They
    /// are stored as weekly, so a frequency filter excludes them explicitly.
    pub fn chores_for_week(
        &self,
        week_start: NaiveDate,
        user_id: Option<i64>,
        frequency: Option<Frequency>,
    ) -> Result<Vec<Chore>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHORE_SELECT}
             WHERE (c.is_active = 1
                    OR (c.is_adhoc = 1 AND EXISTS (
                        SELECT 1 FROM completions x
                        WHERE x.chore_id = c.id AND x.week_start = ?1)))
               AND (?2 IS NULL OR c.assigned_user_id = ?2)
               AND (?3 IS NULL OR (c.frequency = ?3 AND c.is_adhoc = 0))
             ORDER BY c.id"
        ))?;
        let chores = stmt
            .query_map(
                params![week_start.format(DATE_FORMAT).to_string(), user_id, frequency],
                Self::chore_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chores)
    }

    pub fn update_chore(&self, id: i64, chore: &ChoreFields) -> Result<Chore> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE chores SET name = ?1, description = ?2, frequency = ?3, day_of_week = ?4,
                    day_of_week_2 = ?5, assigned_user_id = ?6, is_active = ?7, is_adhoc = ?8,
                    updated_at = ?9
             WHERE id = ?10",
            params![
                chore.name,
                chore.description,
                chore.frequency,
                chore.day_of_week,
                chore.day_of_week_2,
                chore.assigned_user_id,
                chore.is_active,
                chore.is_adhoc,
                now,
                id,
            ],
        )?;
        if rows == 0 {
            return Err(Error::not_found("Chore", id));
        }
        self.get_chore(id)
    }

    /// Removes the chore together with its completions.
    pub fn delete_chore(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM chores WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn find_adhoc_chore(&self, name: &str) -> Result<Option<Chore>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "{CHORE_SELECT} WHERE c.is_adhoc = 1 AND c.name = ?1 COLLATE NOCASE
                     ORDER BY c.id LIMIT 1"
                ),
                params![name],
                Self::chore_from_row,
            )
            .optional()?)
    }

    pub fn adhoc_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT name FROM chores WHERE is_adhoc = 1 ORDER BY name COLLATE NOCASE",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    // --- Completions ---

    pub fn insert_completion(&self, completion: &CompletionFields) -> Result<Completion> {
        self.conn
            .execute(
                "INSERT INTO completions (chore_id, user_id, completed_at, completed_on,
                                          week_start, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    completion.chore_id,
                    completion.user_id,
                    format_timestamp(&completion.completed_at),
                    completion.completed_on.format(DATE_FORMAT).to_string(),
                    completion.week_start.format(DATE_FORMAT).to_string(),
                    completion.notes,
                ],
            )
            .map_err(|e| unique_conflict(e, "Chore already completed on that day"))?;
        let id = self.conn.last_insert_rowid();
        self.get_completion(id)
    }

    pub fn get_completion(&self, id: i64) -> Result<Completion> {
        self.conn
            .query_row(
                &format!("{COMPLETION_SELECT} WHERE x.id = ?1"),
                params![id],
                Self::completion_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Completion", id))
    }

    pub fn find_completion_on(&self, chore_id: i64, day: NaiveDate) -> Result<Option<Completion>> {
        Ok(self
            .conn
            .query_row(
                &format!("{COMPLETION_SELECT} WHERE x.chore_id = ?1 AND x.completed_on = ?2"),
                params![chore_id, day.format(DATE_FORMAT).to_string()],
                Self::completion_from_row,
            )
            .optional()?)
    }

    /// Newest first.
    pub fn list_completions(&self, filter: &CompletionFilter) -> Result<Vec<Completion>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMPLETION_SELECT}
             WHERE (?1 IS NULL OR x.chore_id = ?1)
               AND (?2 IS NULL OR x.user_id = ?2)
               AND (?3 IS NULL OR x.week_start = ?3)
             ORDER BY x.completed_at DESC, x.id DESC
             LIMIT ?4 OFFSET ?5"
        ))?;
        let completions = stmt
            .query_map(
                params![
                    filter.chore_id,
                    filter.user_id,
                    filter.week_start.map(|d| d.format(DATE_FORMAT).to_string()),
                    filter.page.limit,
                    filter.page.skip,
                ],
                Self::completion_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(completions)
    }

    /// Every completion keyed to `week_start`, oldest first.
    pub fn completions_for_week(&self, week_start: NaiveDate) -> Result<Vec<Completion>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMPLETION_SELECT} WHERE x.week_start = ?1 ORDER BY x.completed_at, x.id"
        ))?;
        let completions = stmt
            .query_map(
                params![week_start.format(DATE_FORMAT).to_string()],
                Self::completion_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(completions)
    }

    pub fn update_completion(&self, id: i64, completion: &CompletionFields) -> Result<Completion> {
        let rows = self
            .conn
            .execute(
                "UPDATE completions SET user_id = ?1, completed_at = ?2, completed_on = ?3,
                        week_start = ?4, notes = ?5
                 WHERE id = ?6",
                params![
                    completion.user_id,
                    format_timestamp(&completion.completed_at),
                    completion.completed_on.format(DATE_FORMAT).to_string(),
                    completion.week_start.format(DATE_FORMAT).to_string(),
                    completion.notes,
                    id,
                ],
            )
            .map_err(|e| unique_conflict(e, "Chore already completed on that day"))?;
        if rows == 0 {
            return Err(Error::not_found("Completion", id));
        }
        self.get_completion(id)
    }

    pub fn delete_completion(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM completions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Statistics ---

    pub fn user_totals(&self) -> Result<UserTotals> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_active), 0),
                    COALESCE(SUM(is_admin), 0)
             FROM users",
            [],
            |row| {
                Ok(UserTotals {
                    total: row.get(0)?,
                    active: row.get(1)?,
                    admins: row.get(2)?,
                })
            },
        )?)
    }

    /// Totals over scheduled chores; one-off chores are left out.
    pub fn chore_totals(&self) -> Result<ChoreTotals> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_active), 0),
                    COALESCE(SUM(assigned_user_id IS NULL), 0),
                    COALESCE(SUM(frequency = 'daily'), 0),
                    COALESCE(SUM(frequency = 'weekly'), 0),
                    COALESCE(SUM(frequency = 'twice_weekly'), 0)
             FROM chores WHERE is_adhoc = 0",
            [],
            |row| {
                Ok(ChoreTotals {
                    total: row.get(0)?,
                    active: row.get(1)?,
                    unassigned: row.get(2)?,
                    daily: row.get(3)?,
                    weekly: row.get(4)?,
                    twice_weekly: row.get(5)?,
                })
            },
        )?)
    }

    pub fn count_users(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    pub fn count_chores(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM chores", [], |row| row.get(0))?)
    }

    pub fn count_completions(
        &self,
        user_id: Option<i64>,
        week_start: Option<NaiveDate>,
    ) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM completions
             WHERE (?1 IS NULL OR user_id = ?1)
               AND (?2 IS NULL OR week_start = ?2)",
            params![user_id, week_start.map(|d| d.format(DATE_FORMAT).to_string())],
            |row| row.get(0),
        )?)
    }

    /// Active scheduled chores, optionally only those assigned to `user_id`.
    pub fn count_active_chores(&self, user_id: Option<i64>) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM chores
             WHERE is_active = 1 AND is_adhoc = 0
               AND (?1 IS NULL OR assigned_user_id = ?1)",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    pub fn top_users(&self, week_start: Option<NaiveDate>, limit: i64) -> Result<Vec<UserCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, u.name, COUNT(x.id) AS n
             FROM completions x
             JOIN users u ON u.id = x.user_id
             WHERE (?1 IS NULL OR x.week_start = ?1)
             GROUP BY u.id, u.name
             ORDER BY n DESC, u.name COLLATE NOCASE
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(
                params![week_start.map(|d| d.format(DATE_FORMAT).to_string()), limit],
                |row| {
                    Ok(UserCount {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        count: row.get(2)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn top_chores(&self, limit: i64) -> Result<Vec<ChoreCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, COUNT(x.id) AS n
             FROM completions x
             JOIN chores c ON c.id = x.chore_id
             GROUP BY c.id, c.name
             ORDER BY n DESC, c.name COLLATE NOCASE
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(ChoreCount {
                    chore_id: row.get(0)?,
                    name: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Active scheduled chores with nothing recorded for `week_start`.
    pub fn pending_chores(&self, week_start: NaiveDate, limit: i64) -> Result<Vec<Chore>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHORE_SELECT}
             WHERE c.is_active = 1 AND c.is_adhoc = 0
               AND NOT EXISTS (
                   SELECT 1 FROM completions x
                   WHERE x.chore_id = c.id AND x.week_start = ?1)
             ORDER BY c.name COLLATE NOCASE, c.id
             LIMIT ?2"
        ))?;
        let chores = stmt
            .query_map(
                params![week_start.format(DATE_FORMAT).to_string(), limit],
                Self::chore_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chores)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn unique_conflict(err: rusqlite::Error, msg: &str) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::Conflict(msg.to_string())
        }
        _ => Error::Database(err),
    }
}
