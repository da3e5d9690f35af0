use serde::{Deserialize, Serialize};
use time::Date;
use utoipa::ToSchema;

use super::price::Price;
use crate::utils::{iso_date, FieldErrors};
use bookstore_http::AppError;

pub const TITLE_MAX_LEN: usize = 30;
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// A catalog book with its relationships resolved to identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Assigned by the store; ignored on insert
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub publication_date: Date,
    /// In link order
    pub authors: Vec<AuthorRef>,
    /// Category names, in link order
    pub categories: Vec<String>,
}

/// Book-side view of a linked author.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorRef {
    pub id: i64,
    pub name: String,
}

/// Book as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[schema(value_type = String, example = "12.99")]
    pub price: Price,
    #[serde(with = "iso_date")]
    #[schema(value_type = String, format = Date, example = "1813-01-28")]
    pub publication_date: Date,
    pub author_ids: Vec<i64>,
    pub author_names: Vec<String>,
    pub category_names: Vec<String>,
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        let (author_ids, author_names) = book
            .authors
            .into_iter()
            .map(|author| (author.id, author.name))
            .unzip();

        Self {
            id: book.id,
            title: book.title,
            description: book.description,
            price: book.price,
            publication_date: book.publication_date,
            author_ids,
            author_names,
            category_names: book.categories,
        }
    }
}

/// Request body for creating or replacing a book.
///
/// Omitted relationship lists are treated as empty.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookDto {
    pub title: String,
    pub description: String,
    #[schema(value_type = String, example = "12.99")]
    pub price: Price,
    #[serde(with = "iso_date")]
    #[schema(value_type = String, format = Date, example = "1813-01-28")]
    pub publication_date: Date,
    #[serde(default)]
    pub category_names: Vec<String>,
    #[serde(default)]
    pub author_ids: Vec<i64>,
}

impl CreateBookDto {
    pub fn validate(&self) -> Result<(), AppError> {
        FieldErrors::new()
            .text("title", &self.title, TITLE_MAX_LEN)
            .text("description", &self.description, DESCRIPTION_MAX_LEN)
            .names("categoryNames", &self.category_names)
            .finish("book payload failed validation")
    }
}
