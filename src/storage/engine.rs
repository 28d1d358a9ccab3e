//! Attendance Store
//!
//! SQLite-backed document store for users, students and attendance records,
//! plus the credential, session and reset-token tables the auth layer uses.
//!
//! - Timestamps are stored as Unix milliseconds, calendar dates as
//!   `YYYY-MM-DD` text, and converted to `chrono` values at this boundary.
//! - Every successful write to a collection publishes on the `ChangeFeed`.
//!
//! The connection sits behind a `std::sync::Mutex` because `rusqlite::Connection`
//! is `!Sync`; every call is one short critical section.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::feed::{ChangeFeed, ChangeKind, Collection};
use crate::storage::types::{
    AttendanceOrder, AttendanceQuery, AttendanceRecord, AttendanceStatus, NewAttendanceRecord,
    NewStudent, NewUser, ProfilePatch, Role, Student, StudentPatch, User,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

const USER_COLUMNS: &str =
    "uid, email, display_name, photo_url, role, school_id, created_at, last_login";

const STUDENT_COLUMNS: &str = "id, student_code, name, class, major, email, phone, photo_url, \
     face_embedding, created_at, updated_at, is_synced";

const ATTENDANCE_COLUMNS: &str = "id, student_id, student_name, student_code, class, date, \
     status, timestamp, scanned_by, confidence, session_id, note";

/// Configuration for the store
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for the database file
    pub data_dir: PathBuf,
    /// Capacity of the change feed broadcast channel
    pub feed_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("attendance_data"),
            feed_capacity: 256,
        }
    }
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Get path to the database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("attendance.db")
    }
}

/// Salted password hash as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub salt: String,
    pub hash: String,
}

/// A persisted sign-in session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub token: String,
    pub uid: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The attendance document store
pub struct StorageEngine {
    conn: Mutex<Connection>,
    feed: ChangeFeed,
}

impl StorageEngine {
    /// Open (or create) the store under `config.data_dir`
    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let conn = Connection::open_with_flags(
            config.db_path(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        tracing::info!(path = ?config.db_path(), "Opened attendance store");
        Self::with_connection(conn, ChangeFeed::new(config.feed_capacity))
    }

    /// In-memory store, used by tests and benches
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, ChangeFeed::default())
    }

    fn with_connection(conn: Connection, feed: ChangeFeed) -> StorageResult<Self> {
        create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed,
        })
    }

    /// Change notifications for every collection write
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Cheap round-trip used by readiness probes
    pub fn ping(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    // ============================================
    // USERS
    // ============================================

    /// Create a user document. Emails are unique, case-insensitively.
    pub fn insert_user(&self, new_user: NewUser, now: DateTime<Utc>) -> StorageResult<User> {
        let now = truncate_millis(now);
        let email = new_user.email.trim().to_string();
        let display_name = new_user
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());

        let user = User {
            uid: Uuid::new_v4().to_string(),
            email,
            display_name,
            photo_url: new_user.photo_url,
            role: new_user.role,
            school_id: new_user.school_id,
            created_at: now,
            last_login: None,
        };

        {
            let conn = self.conn()?;
            let exists: Option<String> = conn
                .query_row(
                    "SELECT uid FROM users WHERE email = ?1",
                    params![user.email],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Err(StorageError::Conflict(format!(
                    "email already registered: {}",
                    user.email
                )));
            }

            conn.execute(
                "INSERT INTO users (uid, email, display_name, photo_url, role, school_id, created_at, last_login)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
                params![
                    user.uid,
                    user.email,
                    user.display_name,
                    user.photo_url,
                    user.role.as_str(),
                    user.school_id,
                    to_millis(&user.created_at),
                ],
            )?;
        }

        self.feed.publish(Collection::Users, ChangeKind::Created, &user.uid);
        Ok(user)
    }

    pub fn find_user(&self, uid: &str) -> StorageResult<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE uid = ?1", USER_COLUMNS);
        let user = conn.query_row(&sql, params![uid], user_from_row).optional()?;
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
        let user = conn
            .query_row(&sql, params![email.trim()], user_from_row)
            .optional()?;
        Ok(user)
    }

    pub fn get_user(&self, uid: &str) -> StorageResult<User> {
        self.find_user(uid)?
            .ok_or_else(|| StorageError::not_found("user", uid))
    }

    /// All users, optionally restricted to one role, ordered by email
    pub fn list_users(&self, role: Option<Role>) -> StorageResult<Vec<User>> {
        let users = {
            let conn = self.conn()?;
            let sql = format!("SELECT {} FROM users ORDER BY email", USER_COLUMNS);
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map([], user_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        // Role is filtered after mapping so missing stored roles count as teacher
        Ok(match role {
            Some(role) => users.into_iter().filter(|u| u.role == role).collect(),
            None => users,
        })
    }

    pub fn set_user_role(&self, uid: &str, role: Role) -> StorageResult<User> {
        let changed = self.conn()?.execute(
            "UPDATE users SET role = ?1 WHERE uid = ?2",
            params![role.as_str(), uid],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("user", uid));
        }
        self.feed.publish(Collection::Users, ChangeKind::Updated, uid);
        self.get_user(uid)
    }

    pub fn update_user_profile(&self, uid: &str, patch: &ProfilePatch) -> StorageResult<User> {
        let mut user = self.get_user(uid)?;
        if let Some(name) = &patch.display_name {
            user.display_name = name.clone();
        }
        if let Some(url) = &patch.photo_url {
            user.photo_url = Some(url.clone());
        }
        if let Some(school) = &patch.school_id {
            user.school_id = Some(school.clone());
        }

        self.conn()?.execute(
            "UPDATE users SET display_name = ?1, photo_url = ?2, school_id = ?3 WHERE uid = ?4",
            params![user.display_name, user.photo_url, user.school_id, uid],
        )?;
        self.feed.publish(Collection::Users, ChangeKind::Updated, uid);
        Ok(user)
    }

    pub fn touch_last_login(&self, uid: &str, at: DateTime<Utc>) -> StorageResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE users SET last_login = ?1 WHERE uid = ?2",
            params![to_millis(&at), uid],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("user", uid));
        }
        self.feed.publish(Collection::Users, ChangeKind::Updated, uid);
        Ok(())
    }

    // ============================================
    // CREDENTIALS, SESSIONS, RESET TOKENS
    // ============================================

    pub fn set_credential(&self, uid: &str, credential: &StoredCredential) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT INTO credentials (uid, salt, hash) VALUES (?1, ?2, ?3)
             ON CONFLICT(uid) DO UPDATE SET salt = excluded.salt, hash = excluded.hash",
            params![uid, credential.salt, credential.hash],
        )?;
        Ok(())
    }

    pub fn credential(&self, uid: &str) -> StorageResult<Option<StoredCredential>> {
        let conn = self.conn()?;
        let credential = conn
            .query_row(
                "SELECT salt, hash FROM credentials WHERE uid = ?1",
                params![uid],
                |row| {
                    Ok(StoredCredential {
                        salt: row.get(0)?,
                        hash: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(credential)
    }

    pub fn insert_session(&self, session: &SessionRow) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT INTO sessions (token, uid, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                session.uid,
                to_millis(&session.created_at),
                to_millis(&session.expires_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_session(&self, token: &str) -> StorageResult<Option<SessionRow>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT token, uid, created_at, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| {
                    Ok(SessionRow {
                        token: row.get(0)?,
                        uid: row.get(1)?,
                        created_at: millis_column(row, 2)?,
                        expires_at: millis_column(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    /// Returns whether a session was removed
    pub fn delete_session(&self, token: &str) -> StorageResult<bool> {
        let changed = self
            .conn()?
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(changed > 0)
    }

    pub fn delete_sessions_for(&self, uid: &str) -> StorageResult<usize> {
        let changed = self
            .conn()?
            .execute("DELETE FROM sessions WHERE uid = ?1", params![uid])?;
        Ok(changed)
    }

    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let conn = self.conn()?;
        let sessions = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![to_millis(&now)],
        )?;
        conn.execute(
            "DELETE FROM reset_tokens WHERE expires_at <= ?1",
            params![to_millis(&now)],
        )?;
        Ok(sessions)
    }

    pub fn insert_reset_token(
        &self,
        token: &str,
        uid: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT INTO reset_tokens (token, uid, expires_at) VALUES (?1, ?2, ?3)",
            params![token, uid, to_millis(&expires_at)],
        )?;
        Ok(())
    }

    /// Remove a reset token and return its owner and expiry. Single use.
    pub fn take_reset_token(&self, token: &str) -> StorageResult<Option<(String, DateTime<Utc>)>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let found = tx
            .query_row(
                "SELECT uid, expires_at FROM reset_tokens WHERE token = ?1",
                params![token],
                |row| Ok((row.get::<_, String>(0)?, millis_column(row, 1)?)),
            )
            .optional()?;
        if found.is_some() {
            tx.execute("DELETE FROM reset_tokens WHERE token = ?1", params![token])?;
        }
        tx.commit()?;
        Ok(found)
    }

    // ============================================
    // STUDENTS
    // ============================================

    pub fn insert_student(&self, new: NewStudent, now: DateTime<Utc>) -> StorageResult<Student> {
        new.validate().map_err(StorageError::Validation)?;
        let now = truncate_millis(now);

        let student = Student {
            id: Uuid::new_v4().to_string(),
            student_code: new.student_code.trim().to_string(),
            name: new.name.trim().to_string(),
            class: new.class.trim().to_string(),
            major: new.major,
            email: new.email.filter(|e| !e.trim().is_empty()),
            phone: new.phone.filter(|p| !p.trim().is_empty()),
            photo_url: new.photo_url,
            face_embedding: new.face_embedding,
            created_at: now,
            updated_at: now,
            is_synced: true,
        };

        {
            let conn = self.conn()?;
            write_student(&conn, "INSERT", &student)?;
        }

        self.feed
            .publish(Collection::Students, ChangeKind::Created, &student.id);
        Ok(student)
    }

    pub fn get_student(&self, id: &str) -> StorageResult<Student> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM students WHERE id = ?1", STUDENT_COLUMNS);
        conn.query_row(&sql, params![id], student_from_row)
            .optional()?
            .ok_or_else(|| StorageError::not_found("student", id))
    }

    /// Students ordered by name, optionally restricted to one class
    pub fn list_students(&self, class: Option<&str>) -> StorageResult<Vec<Student>> {
        let conn = self.conn()?;
        let students = match class {
            Some(class) => {
                let sql = format!(
                    "SELECT {} FROM students WHERE class = ?1 ORDER BY name, id",
                    STUDENT_COLUMNS
                );
                let mut stmt = conn.prepare_cached(&sql)?;
                let rows = stmt.query_map(params![class], student_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("SELECT {} FROM students ORDER BY name, id", STUDENT_COLUMNS);
                let mut stmt = conn.prepare_cached(&sql)?;
                let rows = stmt.query_map([], student_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(students)
    }

    pub fn count_students(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Apply a partial update and stamp `updated_at`
    pub fn update_student(
        &self,
        id: &str,
        patch: &StudentPatch,
        now: DateTime<Utc>,
    ) -> StorageResult<Student> {
        let mut student = self.get_student(id)?;
        patch.apply(&mut student);
        student.updated_at = truncate_millis(now);

        {
            let conn = self.conn()?;
            write_student(&conn, "REPLACE", &student)?;
        }

        self.feed
            .publish(Collection::Students, ChangeKind::Updated, id);
        Ok(student)
    }

    /// Remove a student. Attendance rows referencing it are kept.
    pub fn delete_student(&self, id: &str) -> StorageResult<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM students WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::not_found("student", id));
        }
        self.feed
            .publish(Collection::Students, ChangeKind::Deleted, id);
        Ok(())
    }

    // ============================================
    // ATTENDANCE
    // ============================================

    pub fn insert_attendance(
        &self,
        new: NewAttendanceRecord,
        now: DateTime<Utc>,
    ) -> StorageResult<AttendanceRecord> {
        if new.student_id.trim().is_empty() {
            return Err(StorageError::Validation("student_id is required".to_string()));
        }
        if new.class.trim().is_empty() {
            return Err(StorageError::Validation("class is required".to_string()));
        }

        let record = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            student_id: new.student_id,
            student_name: new.student_name,
            student_code: new.student_code,
            class: new.class,
            date: new.date,
            status: new.status,
            timestamp: truncate_millis(new.timestamp.unwrap_or(now)),
            scanned_by: new.scanned_by,
            confidence: new.confidence,
            session_id: new.session_id,
            note: new.note,
        };

        self.conn()?.execute(
            "INSERT INTO attendance (id, student_id, student_name, student_code, class, date,
                status, timestamp, scanned_by, confidence, session_id, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.id,
                record.student_id,
                record.student_name,
                record.student_code,
                record.class,
                record.date.format(DATE_FORMAT).to_string(),
                record.status.as_str(),
                to_millis(&record.timestamp),
                record.scanned_by,
                record.confidence,
                record.session_id,
                record.note,
            ],
        )?;

        self.feed
            .publish(Collection::Attendance, ChangeKind::Created, &record.id);
        Ok(record)
    }

    /// Attendance rows matching `query`
    pub fn query_attendance(&self, query: &AttendanceQuery) -> StorageResult<Vec<AttendanceRecord>> {
        let mut sql = format!("SELECT {} FROM attendance", ATTENDANCE_COLUMNS);
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(from) = query.from {
            clauses.push("date >= ?");
            values.push(Value::Text(from.format(DATE_FORMAT).to_string()));
        }
        if let Some(to) = query.to {
            clauses.push("date <= ?");
            values.push(Value::Text(to.format(DATE_FORMAT).to_string()));
        }
        if let Some(class) = &query.class {
            clauses.push("class = ?");
            values.push(Value::Text(class.clone()));
        }
        if let Some(status) = query.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(student_id) = &query.student_id {
            clauses.push("student_id = ?");
            values.push(Value::Text(student_id.clone()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql.push_str(match query.order {
            AttendanceOrder::NewestFirst => " ORDER BY timestamp DESC, id",
            AttendanceOrder::DateDesc => " ORDER BY date DESC, timestamp DESC, id",
        });

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), attendance_from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
impl StorageEngine {
    /// Run SQL that bypasses validation, then announce a change on `collection`
    pub(crate) fn execute_unchecked(&self, collection: Collection, sql: &str) -> StorageResult<()> {
        self.conn()?.execute_batch(sql)?;
        self.feed.publish(collection, ChangeKind::Updated, "unchecked");
        Ok(())
    }
}

fn create_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            uid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            display_name TEXT NOT NULL,
            photo_url TEXT,
            role TEXT,
            school_id TEXT,
            created_at INTEGER NOT NULL,
            last_login INTEGER
        );

        CREATE TABLE IF NOT EXISTS credentials (
            uid TEXT PRIMARY KEY REFERENCES users(uid) ON DELETE CASCADE,
            salt TEXT NOT NULL,
            hash TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            uid TEXT NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reset_tokens (
            token TEXT PRIMARY KEY,
            uid TEXT NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
            expires_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            student_code TEXT NOT NULL,
            name TEXT NOT NULL,
            class TEXT NOT NULL,
            major TEXT NOT NULL DEFAULT '',
            email TEXT,
            phone TEXT,
            photo_url TEXT,
            face_embedding TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            is_synced INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_students_class ON students(class);
        CREATE INDEX IF NOT EXISTS idx_students_name ON students(name);

        CREATE TABLE IF NOT EXISTS attendance (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            student_code TEXT NOT NULL,
            class TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            scanned_by TEXT,
            confidence REAL,
            session_id TEXT,
            note TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date);
        CREATE INDEX IF NOT EXISTS idx_attendance_timestamp ON attendance(timestamp);
        CREATE INDEX IF NOT EXISTS idx_attendance_class_date ON attendance(class, date);
        ",
    )?;
    Ok(())
}

fn write_student(conn: &Connection, verb: &str, student: &Student) -> StorageResult<()> {
    let embedding = student
        .face_embedding
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let sql = format!(
        "{} INTO students ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        verb, STUDENT_COLUMNS
    );
    conn.execute(
        &sql,
        params![
            student.id,
            student.student_code,
            student.name,
            student.class,
            student.major,
            student.email,
            student.phone,
            student.photo_url,
            embedding,
            to_millis(&student.created_at),
            to_millis(&student.updated_at),
            student.is_synced,
        ],
    )?;
    Ok(())
}

fn to_millis(at: &DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Drop sub-millisecond precision so returned records equal what is read back
fn truncate_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn millis_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| conversion_error(idx, format!("timestamp out of range: {}", ms)))
}

fn optional_millis_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(_) => millis_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: Option<String> = row.get(4)?;
    Ok(User {
        uid: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        photo_url: row.get(3)?,
        role: Role::from_stored(role.as_deref()),
        school_id: row.get(5)?,
        created_at: millis_column(row, 6)?,
        last_login: optional_millis_column(row, 7)?,
    })
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let embedding: Option<String> = row.get(8)?;
    let face_embedding = embedding
        .map(|json| serde_json::from_str::<Vec<f32>>(&json))
        .transpose()
        .map_err(|e| conversion_error(8, e.to_string()))?;
    let is_synced: Option<bool> = row.get(11)?;

    Ok(Student {
        id: row.get(0)?,
        student_code: row.get(1)?,
        name: row.get(2)?,
        class: row.get(3)?,
        major: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        photo_url: row.get(7)?,
        face_embedding,
        created_at: millis_column(row, 9)?,
        updated_at: millis_column(row, 10)?,
        is_synced: is_synced.unwrap_or(true),
    })
}

fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let date: String = row.get(5)?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| conversion_error(5, format!("{}: {}", date, e)))?;
    let status: String = row.get(6)?;
    let status = status
        .parse::<AttendanceStatus>()
        .map_err(|e| conversion_error(6, e))?;

    Ok(AttendanceRecord {
        id: row.get(0)?,
        student_id: row.get(1)?,
        student_name: row.get(2)?,
        student_code: row.get(3)?,
        class: row.get(4)?,
        date,
        status,
        timestamp: millis_column(row, 7)?,
        scanned_by: row.get(8)?,
        confidence: row.get(9)?,
        session_id: row.get(10)?,
        note: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn teacher(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            display_name: None,
            photo_url: None,
            role: Role::Teacher,
            school_id: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::new(dir.path());
        let store = StorageEngine::open(&config).unwrap();
        store.ping().unwrap();
        assert!(config.db_path().exists());
    }

    #[test]
    fn test_user_display_name_falls_back_to_email() {
        let store = StorageEngine::open_in_memory().unwrap();
        let user = store.insert_user(teacher("gv@school.edu"), Utc::now()).unwrap();
        assert_eq!(user.display_name, "gv@school.edu");
        assert_eq!(store.get_user(&user.uid).unwrap(), user);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let store = StorageEngine::open_in_memory().unwrap();
        store.insert_user(teacher("a@school.edu"), Utc::now()).unwrap();
        let err = store
            .insert_user(teacher("A@School.edu"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn test_missing_role_reads_as_teacher() {
        let store = StorageEngine::open_in_memory().unwrap();
        let user = store.insert_user(teacher("t@school.edu"), Utc::now()).unwrap();
        store
            .conn()
            .unwrap()
            .execute("UPDATE users SET role = NULL WHERE uid = ?1", params![user.uid])
            .unwrap();

        assert_eq!(store.get_user(&user.uid).unwrap().role, Role::Teacher);
        assert_eq!(store.list_users(Some(Role::Teacher)).unwrap().len(), 1);
    }

    #[test]
    fn test_student_crud_and_ordering() {
        let store = StorageEngine::open_in_memory().unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let b = store
            .insert_student(NewStudent::new("SV002", "Binh", "12A1"), t0)
            .unwrap();
        store
            .insert_student(NewStudent::new("SV001", "An", "12A2"), t0)
            .unwrap();

        let names: Vec<_> = store
            .list_students(None)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["An", "Binh"]);
        assert_eq!(store.list_students(Some("12A1")).unwrap().len(), 1);

        let t1 = t0 + Duration::hours(1);
        let patch = StudentPatch {
            phone: Some("0900".into()),
            ..Default::default()
        };
        let updated = store.update_student(&b.id, &patch, t1).unwrap();
        assert_eq!(updated.updated_at, t1);
        assert_eq!(updated.created_at, t0);
        assert_eq!(updated.phone.as_deref(), Some("0900"));

        store.delete_student(&b.id).unwrap();
        assert!(matches!(
            store.get_student(&b.id),
            Err(StorageError::NotFound { .. })
        ));
        assert!(store.delete_student(&b.id).is_err());
    }

    #[test]
    fn test_student_embedding_is_kept() {
        let store = StorageEngine::open_in_memory().unwrap();
        let mut new = NewStudent::new("SV009", "Chi", "12A1");
        new.face_embedding = Some(vec![0.25, -1.5]);
        let student = store.insert_student(new, Utc::now()).unwrap();
        let loaded = store.get_student(&student.id).unwrap();
        assert_eq!(loaded.face_embedding, Some(vec![0.25, -1.5]));
    }

    #[test]
    fn test_invalid_student_rejected() {
        let store = StorageEngine::open_in_memory().unwrap();
        let err = store
            .insert_student(NewStudent::new("SV001", "", "12A1"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
        assert_eq!(store.count_students().unwrap(), 0);
    }

    #[test]
    fn test_attendance_query_filters() {
        let store = StorageEngine::open_in_memory().unwrap();
        let a = store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        let b = store
            .insert_student(NewStudent::new("SV002", "Binh", "12A2"), Utc::now())
            .unwrap();

        for (student, date, status) in [
            (&a, day(1), AttendanceStatus::Present),
            (&a, day(2), AttendanceStatus::Late),
            (&b, day(2), AttendanceStatus::Absent),
            (&b, day(3), AttendanceStatus::Present),
        ] {
            let at = Utc.from_utc_datetime(&date.and_hms_opt(7, 30, 0).unwrap());
            store
                .insert_attendance(
                    NewAttendanceRecord::for_student(student, date, status).timestamp(at),
                    Utc::now(),
                )
                .unwrap();
        }

        assert_eq!(store.query_attendance(&AttendanceQuery::new()).unwrap().len(), 4);
        assert_eq!(store.query_attendance(&AttendanceQuery::on(day(2))).unwrap().len(), 2);
        assert_eq!(
            store
                .query_attendance(&AttendanceQuery::since(day(2)).class("12A2"))
                .unwrap()
                .len(),
            2
        );
        let present = store
            .query_attendance(&AttendanceQuery::new().status(AttendanceStatus::Present))
            .unwrap();
        assert_eq!(present.len(), 2);

        let newest = store
            .query_attendance(&AttendanceQuery::new().limit(1))
            .unwrap();
        assert_eq!(newest[0].date, day(3));
    }

    #[test]
    fn test_writes_publish_changes() {
        let store = StorageEngine::open_in_memory().unwrap();
        let mut rx = store.feed().subscribe();

        let student = store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        store
            .insert_attendance(
                NewAttendanceRecord::for_student(&student, day(1), AttendanceStatus::Present),
                Utc::now(),
            )
            .unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.collection, Collection::Students);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.collection, Collection::Attendance);
    }

    #[test]
    fn test_sessions_and_reset_tokens() {
        let store = StorageEngine::open_in_memory().unwrap();
        let user = store.insert_user(teacher("t@school.edu"), Utc::now()).unwrap();
        let now = Utc::now();

        let session = SessionRow {
            token: "tok".into(),
            uid: user.uid.clone(),
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        store.insert_session(&session).unwrap();
        assert!(store.find_session("tok").unwrap().is_some());
        assert_eq!(store.purge_expired_sessions(now + Duration::hours(2)).unwrap(), 1);
        assert!(store.find_session("tok").unwrap().is_none());

        store
            .insert_reset_token("reset", &user.uid, now + Duration::minutes(5))
            .unwrap();
        assert!(store.take_reset_token("reset").unwrap().is_some());
        assert!(store.take_reset_token("reset").unwrap().is_none());
    }
}
