//! Live collection mirror
//!
//! `LiveMirror::subscribe` runs a query once, then again after every change
//! to the query's collection, and hands the full current result set to the
//! caller's `on_update` callback. Failures go to `on_error` and the
//! subscription stays registered.
//!
//! The returned `Subscription` is the single cancellation handle. After
//! `cancel()` returns no callback starts; cancelling again is a no-op, and
//! dropping the handle cancels it.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::ThreadId;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::AbortHandle;

use crate::report::today;
use crate::storage::{
    AttendanceOrder, AttendanceQuery, AttendanceRecord, Collection, Role, StorageEngine,
    StorageError, StorageResult, Student,
};

/// Rows returned by the recent-attendance mirror
pub const RECENT_ATTENDANCE_LIMIT: usize = 100;

/// What a mirror keeps in sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorQuery {
    /// All attendance, newest first, capped at `RECENT_ATTENDANCE_LIMIT`
    RecentAttendance,
    /// Attendance dated today or later, newest date first
    TodayAttendance,
    /// One class on one calendar day
    ClassAttendance { class: String, date: NaiveDate },
    /// Every student, by name
    Students,
}

impl MirrorQuery {
    pub fn collection(&self) -> Collection {
        match self {
            MirrorQuery::Students => Collection::Students,
            _ => Collection::Attendance,
        }
    }

    /// Stable key, used as the topic name on the wire
    pub fn key(&self) -> String {
        match self {
            MirrorQuery::RecentAttendance => "attendance.recent".to_string(),
            MirrorQuery::TodayAttendance => "attendance.today".to_string(),
            MirrorQuery::ClassAttendance { class, date } => {
                format!("attendance.class:{}:{}", class, date.format("%Y-%m-%d"))
            }
            MirrorQuery::Students => "students".to_string(),
        }
    }

    /// Roles allowed to mirror this query, `None` for everyone signed in
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            MirrorQuery::Students => Some(&[Role::Admin, Role::Teacher]),
            _ => None,
        }
    }

    /// Run the query against the store
    pub fn run(&self, store: &StorageEngine, today: NaiveDate) -> StorageResult<MirrorSnapshot> {
        let query = match self {
            MirrorQuery::Students => {
                return store.list_students(None).map(MirrorSnapshot::Students);
            }
            MirrorQuery::RecentAttendance => AttendanceQuery::new()
                .order(AttendanceOrder::NewestFirst)
                .limit(RECENT_ATTENDANCE_LIMIT),
            MirrorQuery::TodayAttendance => {
                AttendanceQuery::since(today).order(AttendanceOrder::DateDesc)
            }
            MirrorQuery::ClassAttendance { class, date } => AttendanceQuery::on(*date)
                .class(class.clone())
                .order(AttendanceOrder::DateDesc),
        };
        store.query_attendance(&query).map(MirrorSnapshot::Attendance)
    }
}

/// Full current result set of a mirror
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "collection", content = "records", rename_all = "lowercase")]
pub enum MirrorSnapshot {
    Attendance(Vec<AttendanceRecord>),
    Students(Vec<Student>),
}

impl MirrorSnapshot {
    pub fn len(&self) -> usize {
        match self {
            MirrorSnapshot::Attendance(records) => records.len(),
            MirrorSnapshot::Students(students) => students.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serialises callbacks against cancellation
struct Gate {
    active: AtomicBool,
    /// Held for the duration of every callback
    callback: Mutex<()>,
    /// Thread currently running a callback
    running_on: Mutex<Option<ThreadId>>,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Gate {
    fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            callback: Mutex::new(()),
            running_on: Mutex::new(None),
        }
    }

    /// Run `f` unless cancelled. Returns false once cancelled.
    fn run(&self, f: impl FnOnce()) -> bool {
        let _guard = relock(&self.callback);
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        *relock(&self.running_on) = Some(std::thread::current().id());
        f();
        *relock(&self.running_on) = None;
        true
    }

    /// Close the gate. Returns false if it was already closed.
    fn close(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        // Wait out a callback in flight, unless it is the caller itself
        let reentrant = *relock(&self.running_on) == Some(std::thread::current().id());
        if !reentrant {
            drop(relock(&self.callback));
        }
        true
    }
}

/// Cancellation handle of one mirror registration
pub struct Subscription {
    key: String,
    gate: Arc<Gate>,
    task: AbortHandle,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_active(&self) -> bool {
        self.gate.active.load(Ordering::SeqCst)
    }

    /// Stop all further callbacks. Safe to call more than once.
    pub fn cancel(&self) {
        if self.gate.close() {
            self.task.abort();
            tracing::debug!(topic = %self.key, "Mirror subscription cancelled");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Registers mirrors over a store's change feed
#[derive(Clone)]
pub struct LiveMirror {
    store: Arc<StorageEngine>,
}

impl LiveMirror {
    pub fn new(store: Arc<StorageEngine>) -> Self {
        Self { store }
    }

    /// Register a mirror. Must be called inside a Tokio runtime.
    pub fn subscribe<U, E>(&self, query: MirrorQuery, on_update: U, on_error: E) -> Subscription
    where
        U: Fn(MirrorSnapshot) + Send + Sync + 'static,
        E: Fn(StorageError) + Send + Sync + 'static,
    {
        let gate = Arc::new(Gate::new());
        let key = query.key();

        // Listen before the first read so no change slips between them
        let mut changes = self.store.feed().subscribe();
        let store = Arc::clone(&self.store);
        let task_gate = Arc::clone(&gate);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let collection = query.collection();
            let refresh = || match query.run(&store, today()) {
                Ok(snapshot) => task_gate.run(|| on_update(snapshot)),
                Err(e) => {
                    tracing::warn!(topic = %task_key, error = %e, "Mirror query failed");
                    task_gate.run(|| on_error(e))
                }
            };

            if !refresh() {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(event) if event.collection == collection => {
                        if !refresh() {
                            break;
                        }
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(topic = %task_key, skipped, "Mirror lagged, re-reading");
                        if !refresh() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        tracing::debug!(topic = %key, "Mirror subscription registered");
        Subscription {
            key,
            gate,
            task: handle.abort_handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AttendanceStatus, NewAttendanceRecord, NewStudent};
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn store() -> Arc<StorageEngine> {
        Arc::new(StorageEngine::open_in_memory().unwrap())
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<MirrorSnapshot>) -> MirrorSnapshot {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("snapshot in time")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_initial_snapshot_then_updates() {
        let store = store();
        store
            .insert_student(NewStudent::new("SV002", "Binh", "12A1"), Utc::now())
            .unwrap();

        let mirror = LiveMirror::new(Arc::clone(&store));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = mirror.subscribe(
            MirrorQuery::Students,
            move |snapshot| {
                let _ = tx.send(snapshot);
            },
            |_| {},
        );

        assert_eq!(next(&mut rx).await.len(), 1);

        store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        match next(&mut rx).await {
            MirrorSnapshot::Students(students) => {
                assert_eq!(students.len(), 2);
                assert_eq!(students[0].name, "An");
            }
            other => panic!("unexpected snapshot: {:?}", other),
        }

        sub.cancel();
    }

    #[tokio::test]
    async fn test_other_collections_do_not_trigger() {
        let store = store();
        let mirror = LiveMirror::new(Arc::clone(&store));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = mirror.subscribe(
            MirrorQuery::RecentAttendance,
            move |snapshot| {
                let _ = tx.send(snapshot);
            },
            |_| {},
        );
        assert!(next(&mut rx).await.is_empty());

        let student = store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());

        store
            .insert_attendance(
                NewAttendanceRecord::for_student(&student, today(), AttendanceStatus::Present),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(next(&mut rx).await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_updates_and_is_idempotent() {
        let store = store();
        let mirror = LiveMirror::new(Arc::clone(&store));
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let counter = Arc::clone(&calls);
        let sub = mirror.subscribe(
            MirrorQuery::Students,
            move |snapshot| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(snapshot);
            },
            |_| {},
        );
        next(&mut rx).await;

        sub.cancel();
        sub.cancel();
        assert!(!sub.is_active());

        let before = calls.load(Ordering::SeqCst);
        store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let store = store();
        let mirror = LiveMirror::new(Arc::clone(&store));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = mirror.subscribe(
            MirrorQuery::Students,
            move |snapshot| {
                let _ = tx.send(snapshot);
            },
            |_| {},
        );
        next(&mut rx).await;
        drop(sub);

        store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        // sender was dropped with the aborted task
        let received = timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(matches!(received, Ok(None) | Err(_)));
    }

    #[tokio::test]
    async fn test_cancel_from_inside_callback() {
        let store = store();
        let mirror = LiveMirror::new(Arc::clone(&store));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let inner = Arc::clone(&slot);
        let sub = mirror.subscribe(
            MirrorQuery::Students,
            move |snapshot| {
                let _ = tx.send(snapshot);
                if let Some(sub) = inner.lock().unwrap().as_ref() {
                    sub.cancel();
                }
            },
            |_| {},
        );
        next(&mut rx).await;
        *slot.lock().unwrap() = Some(sub);

        store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        next(&mut rx).await;

        let guard = slot.lock().unwrap();
        assert!(!guard.as_ref().unwrap().is_active());
    }

    #[tokio::test]
    async fn test_query_failure_reports_error_and_keeps_running() {
        let store = store();
        let mirror = LiveMirror::new(Arc::clone(&store));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (err_tx, mut err_rx) = mpsc::unbounded_channel();
        let sub = mirror.subscribe(
            MirrorQuery::RecentAttendance,
            move |snapshot| {
                let _ = tx.send(snapshot);
            },
            move |e: StorageError| {
                let _ = err_tx.send(e.to_string());
            },
        );
        assert!(next(&mut rx).await.is_empty());

        // a row the reader cannot decode
        store
            .execute_unchecked(
                Collection::Attendance,
                "INSERT INTO attendance (id, student_id, student_name, student_code, class,
                    date, status, timestamp)
                 VALUES ('bad', 's1', 'An', 'SV001', '12A1', '2024-03-01', 'teleported', 0)",
            )
            .unwrap();
        let message = timeout(Duration::from_secs(2), err_rx.recv())
            .await
            .expect("error in time")
            .expect("channel open");
        assert!(message.contains("teleported"), "{}", message);
        assert!(sub.is_active());

        store
            .execute_unchecked(Collection::Attendance, "DELETE FROM attendance WHERE id = 'bad'")
            .unwrap();
        assert!(next(&mut rx).await.is_empty());

        let student = store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        store
            .insert_attendance(
                NewAttendanceRecord::for_student(&student, today(), AttendanceStatus::Present),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(next(&mut rx).await.len(), 1);

        sub.cancel();
        store
            .execute_unchecked(
                Collection::Attendance,
                "UPDATE attendance SET status = 'teleported'",
            )
            .unwrap();
        store
            .insert_attendance(
                NewAttendanceRecord::for_student(&student, today(), AttendanceStatus::Late),
                Utc::now(),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(matches!(rx.try_recv(), Err(_)));
        assert!(matches!(err_rx.try_recv(), Err(_)));
    }

    #[test]
    fn test_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let query = MirrorQuery::ClassAttendance {
            class: "12A1".into(),
            date,
        };
        assert_eq!(query.key(), "attendance.class:12A1:2024-03-01");
        assert_eq!(query.collection(), Collection::Attendance);
        assert_eq!(MirrorQuery::Students.collection(), Collection::Students);
    }
}
