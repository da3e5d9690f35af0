use serde::{Deserialize, Serialize};
use time::Date;
use utoipa::ToSchema;

use crate::utils::{iso_date, FieldErrors};
use bookstore_http::AppError;

pub const NAME_MAX_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub date_of_birth: Date,
    /// Possibly empty, in link order
    pub books: Vec<BookRef>,
}

/// Author-side view of a linked book.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookRef {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    pub id: i64,
    pub name: String,
    #[serde(with = "iso_date")]
    #[schema(value_type = String, format = Date, example = "1775-12-16")]
    pub date_of_birth: Date,
    pub book_ids: Vec<i64>,
    pub book_titles: Vec<String>,
}

impl From<Author> for AuthorDto {
    fn from(author: Author) -> Self {
        let (book_ids, book_titles) = author
            .books
            .into_iter()
            .map(|book| (book.id, book.title))
            .unzip();

        Self {
            id: author.id,
            name: author.name,
            date_of_birth: author.date_of_birth,
            book_ids,
            book_titles,
        }
    }
}

/// Request body for creating or replacing an author.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthorDto {
    pub name: String,
    #[serde(with = "iso_date")]
    #[schema(value_type = String, format = Date, example = "1775-12-16")]
    pub date_of_birth: Date,
    /// Optional; authors may have no books
    #[serde(default)]
    pub book_ids: Vec<i64>,
}

impl CreateAuthorDto {
    pub fn validate(&self) -> Result<(), AppError> {
        FieldErrors::new()
            .text("name", &self.name, NAME_MAX_LEN)
            .finish("author payload failed validation")
    }
}
