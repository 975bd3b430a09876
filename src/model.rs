use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CANONICAL_AUTHOR: &str = "Omraam Mikhaël Aïvanhov";
pub const DEFAULT_LANGUAGE: &str = "English";
pub const LANGUAGES: &[&str] = &[
    "English",
    "French",
    "Spanish",
    "German",
    "Italian",
    "Bulgarian",
];

/// Shown on the home page when no quote can be fetched.
pub const FALLBACK_QUOTES: &[&str] = &[
    "Let light, peace, and wisdom guide your every thought.",
    "The sun is the image of the divine light that illuminates the world.",
    "True spirituality is not about escaping the world, but about transforming it.",
    "Love is the key that opens all doors.",
    "The mind is the gardener who cultivates the garden of the soul.",
];

/// Sentinel category meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub cover_url: Option<String>,
    pub pdf_url: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub pages: u32,
    pub language: String,
    #[serde(default)]
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for the `books` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub category: String,
    pub cover_url: Option<String>,
    pub pdf_url: Option<String>,
    pub year: i32,
    pub pages: u32,
    pub language: String,
    pub is_featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub id: String,
    pub text: String,
    pub source: String,
    pub book_id: Option<String>,
    #[serde(default)]
    pub is_daily: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingProgress {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub percentage_complete: u32,
    pub last_read_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub page_number: u32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    /// Display name used by the header: the local part of the email.
    pub fn short_name(&self) -> &str {
        self.email.split('@').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Title,
    Year,
    CreatedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Year => "year",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn is_ascending(self) -> bool {
        matches!(self, Self::Asc)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchFilters {
    #[serde(default)]
    pub query: String,
    /// Category name; empty or [`ALL_CATEGORIES`] disables the filter.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub year_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl SearchFilters {
    pub fn category_filter(&self) -> Option<&str> {
        let category = self.category.trim();
        if category.is_empty() || category == ALL_CATEGORIES {
            None
        } else {
            Some(category)
        }
    }
}
