use serde::{Deserialize, Serialize};

/// A stored bookmark row. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub user_id: String,
    /// Milliseconds since the UNIX epoch, strictly increasing per insert.
    pub created_at: i64,
}

/// The client-supplied part of a bookmark, as sent to the store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub user_id: String,
}

/// Columns of the `bookmarks` table that may appear in an equality filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkColumn {
    Id,
    Title,
    Url,
    UserId,
}

impl BookmarkColumn {
    /// SQL column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookmarkColumn::Id => "id",
            BookmarkColumn::Title => "title",
            BookmarkColumn::Url => "url",
            BookmarkColumn::UserId => "user_id",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(BookmarkColumn::Id),
            "title" => Some(BookmarkColumn::Title),
            "url" => Some(BookmarkColumn::Url),
            "user_id" => Some(BookmarkColumn::UserId),
            _ => None,
        }
    }

    /// Reads this column's value from a bookmark row.
    pub fn value_of<'a>(&self, bookmark: &'a Bookmark) -> &'a str {
        match self {
            BookmarkColumn::Id => &bookmark.id,
            BookmarkColumn::Title => &bookmark.title,
            BookmarkColumn::Url => &bookmark.url,
            BookmarkColumn::UserId => &bookmark.user_id,
        }
    }
}
