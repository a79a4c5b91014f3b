use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The discriminator that fixes a form's permanent type.
///
/// Stored as the Postgres enum `form_type`. Lawn treatment forms are recorded
/// as `pesticide`; the word `lawn` is accepted as an alias when parsing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "form_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    Shrub,
    #[serde(alias = "lawn")]
    Pesticide,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Shrub => "shrub",
            FormType::Pesticide => "pesticide",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shrub" => Ok(FormType::Shrub),
            "pesticide" | "lawn" => Ok(FormType::Pesticide),
            other => Err(format!("unknown form type '{other}'")),
        }
    }
}

/// The role an authenticated user holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Admin,
}

/// Whether an administrator has approved the account yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Pending,
    Approved,
}

/// Columns a form listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    FirstName,
    LastName,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Parses a client-supplied sort key. Anything outside the allow-list
    /// yields the default (`created_at`) instead of an error.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "first_name" => SortField::FirstName,
            "last_name" => SortField::LastName,
            "created_at" => SortField::CreatedAt,
            _ => SortField::default(),
        }
    }
}

/// Listing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Same permissive policy as [`SortField::parse_or_default`].
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => SortOrder::default(),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
