//! Screen-side filtering, pagination and user tallies

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::{AttendanceRecord, AttendanceStatus, Role, User};

/// Rows per page when the caller does not say
pub const DEFAULT_PER_PAGE: usize = 10;

/// Attendance screen filter; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceFilter {
    pub class: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub date: Option<NaiveDate>,
}

impl AttendanceFilter {
    /// Treats `"all"` and blank classes as no class filter
    pub fn class(mut self, class: Option<&str>) -> Self {
        self.class = class
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(String::from);
        self
    }

    pub fn status(mut self, status: Option<AttendanceStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.class.as_deref().map_or(true, |c| record.class == c)
            && self.status.map_or(true, |s| record.status == s)
            && self.date.map_or(true, |d| record.date == d)
    }

    pub fn apply(&self, records: &[AttendanceRecord]) -> Vec<AttendanceRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// One page of a larger list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice `items` into 1-based page `page`; pages past the end are empty
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = if per_page == 0 { DEFAULT_PER_PAGE } else { per_page };
    let page = page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page);

    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);

    Page {
        items: items[start..end].to_vec(),
        page,
        per_page,
        total,
        total_pages,
    }
}

/// Users whose email or display name contains `term`, ignoring case
pub fn search_users(users: &[User], term: &str) -> Vec<User> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return users.to_vec();
    }
    users
        .iter()
        .filter(|u| {
            u.email.to_lowercase().contains(&term) || u.display_name.to_lowercase().contains(&term)
        })
        .cloned()
        .collect()
}

/// Users per role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub total: usize,
    pub admin: usize,
    pub teacher: usize,
    pub parent: usize,
}

impl RoleCounts {
    pub fn from_users(users: &[User]) -> Self {
        let mut counts = Self {
            total: users.len(),
            ..Default::default()
        };
        for user in users {
            match user.role {
                Role::Admin => counts.admin += 1,
                Role::Teacher => counts.teacher += 1,
                Role::Parent => counts.parent += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::stats::tests::record;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn user(email: &str, name: &str, role: Role) -> User {
        User {
            uid: email.to_string(),
            email: email.to_string(),
            display_name: name.to_string(),
            photo_url: None,
            role,
            school_id: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    fn sample() -> Vec<AttendanceRecord> {
        vec![
            record(1, "12A1", day(1), AttendanceStatus::Present),
            record(2, "12A1", day(1), AttendanceStatus::Late),
            record(3, "12A2", day(1), AttendanceStatus::Present),
            record(4, "12A1", day(2), AttendanceStatus::Present),
        ]
    }

    #[test]
    fn test_filter_matches_all_fields() {
        let filter = AttendanceFilter::default()
            .class(Some("12A1"))
            .status(Some(AttendanceStatus::Present))
            .date(Some(day(1)));

        let rows = filter.apply(&sample());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "1");
    }

    #[test]
    fn test_filter_all_class_is_no_filter() {
        let filter = AttendanceFilter::default().class(Some("all"));
        assert_eq!(filter.class, None);
        assert_eq!(filter.apply(&sample()).len(), 4);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = AttendanceFilter::default().class(Some("12A1"));
        let once = filter.apply(&sample());
        let twice = filter.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_paginate() {
        let items: Vec<usize> = (0..25).collect();

        let first = paginate(&items, 1, 0);
        assert_eq!(first.per_page, DEFAULT_PER_PAGE);
        assert_eq!(first.items, (0..10).collect::<Vec<_>>());
        assert_eq!(first.total_pages, 3);

        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, (20..25).collect::<Vec<_>>());

        assert!(paginate(&items, 9, 10).items.is_empty());
        assert_eq!(paginate::<usize>(&[], 1, 10).total_pages, 0);
    }

    #[test]
    fn test_search_users_ignores_case() {
        let users = vec![
            user("an@school.vn", "Nguyen Van An", Role::Teacher),
            user("binh@school.vn", "Tran Binh", Role::Parent),
        ];

        assert_eq!(search_users(&users, "AN@").len(), 1);
        assert_eq!(search_users(&users, "tran").len(), 1);
        assert_eq!(search_users(&users, "  ").len(), 2);

        let once = search_users(&users, "school");
        assert_eq!(search_users(&once, "school"), once);
    }

    #[test]
    fn test_role_counts() {
        let users = vec![
            user("a@x.vn", "A", Role::Admin),
            user("b@x.vn", "B", Role::Parent),
            user("c@x.vn", "C", Role::Parent),
        ];
        let counts = RoleCounts::from_users(&users);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.parent, 2);
        assert_eq!(counts.teacher, 0);
    }
}
