use crate::service::UserSummary;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::str::FromStr;

pub const NOT_AVAILABLE: &str = "N/A";
pub const UNNAMED: &str = "Không có tên";
pub const EMPTY_ROSTER: &str = "Không có người dùng nào";
pub const LOADING_ROSTER: &str = "Đang tải danh sách người dùng...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Id,
    /// Newest first.
    CreatedAt,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "id" => Ok(SortKey::Id),
            "created_at" | "created-at" => Ok(SortKey::CreatedAt),
            other => Err(format!("unknown sort key '{}' (name, id, created_at)", other)),
        }
    }
}

/// Client-side copy of the user list. Replaced wholesale on every reload.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    users: Vec<UserSummary>,
}

impl Roster {
    pub fn new(users: Vec<UserSummary>) -> Self {
        Self { users }
    }

    pub fn users(&self) -> &[UserSummary] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn all(&self) -> Vec<&UserSummary> {
        self.users.iter().collect()
    }

    /// Case-insensitive substring match on name, id, email, phone, department and position.
    pub fn filter(&self, query: &str) -> Vec<&UserSummary> {
        let needle = query.to_lowercase();
        self.users
            .iter()
            .filter(|user| {
                std::iter::once(Some(&user.id))
                    .chain([
                        user.name.as_ref(),
                        user.email.as_ref(),
                        user.phone.as_ref(),
                        user.department.as_ref(),
                        user.position.as_ref(),
                    ])
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn sorted(&self, key: SortKey) -> Vec<&UserSummary> {
        let mut users = self.all();
        match key {
            SortKey::Name => users.sort_by(|a, b| {
                let a = a.name.as_deref().unwrap_or("");
                let b = b.name.as_deref().unwrap_or("");
                a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
            }),
            SortKey::Id => users.sort_by(|a, b| a.id.cmp(&b.id)),
            SortKey::CreatedAt => users.sort_by(|a, b| {
                let a = a.created_at.as_deref().and_then(parse_timestamp);
                let b = b.created_at.as_deref().and_then(parse_timestamp);
                // None orders first, so reversing puts missing timestamps last.
                b.cmp(&a)
            }),
        }
        users
    }
}

/// Accepts the service's `%Y-%m-%d %H:%M:%S`, ISO-8601/RFC 3339 and bare dates.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCard {
    pub id: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub created_at: String,
    pub last_recognized: Option<String>,
    pub image_count: usize,
}

fn or_not_available(field: &Option<String>) -> String {
    field
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

impl From<&UserSummary> for UserCard {
    fn from(user: &UserSummary) -> Self {
        Self {
            id: user.id.clone(),
            title: user
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNNAMED.to_string()),
            email: or_not_available(&user.email),
            phone: or_not_available(&user.phone),
            created_at: or_not_available(&user.created_at),
            last_recognized: user.last_recognized.clone().filter(|v| !v.is_empty()),
            image_count: user.face_image_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterView {
    Loading,
    Failed(String),
    Empty,
    Cards(Vec<UserCard>),
}

impl RosterView {
    pub fn from_users(users: &[&UserSummary]) -> Self {
        if users.is_empty() {
            RosterView::Empty
        } else {
            RosterView::Cards(users.iter().map(|u| UserCard::from(*u)).collect())
        }
    }
}
