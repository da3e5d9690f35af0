use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection};
use time::Date;

use super::models::{AuthorRef, Book};
use super::price::Price;
use crate::repository::{push_in_list, Repository, IN_LIST_CHUNK};

const SELECT_BOOKS: &str =
    "SELECT id, title, description, price_cents, publication_date FROM books";

#[derive(sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    description: String,
    price_cents: i64,
    publication_date: Date,
}

/// Title and author lookups on top of the generic book repository.
#[async_trait]
pub trait BookSearch: Repository<Book, i64> {
    /// Books whose title starts with `prefix` (case-sensitive).
    async fn search_by_title_prefix(&mut self, prefix: &str) -> anyhow::Result<Vec<Book>>;

    /// Books with at least one author named exactly `name`.
    async fn search_by_author_name(&mut self, name: &str) -> anyhow::Result<Vec<Book>>;
}

pub struct BooksRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> BooksRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Attach author and category links to the fetched rows.
    async fn hydrate(&mut self, rows: Vec<BookRow>) -> anyhow::Result<Vec<Book>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

        let mut authors: HashMap<i64, Vec<AuthorRef>> = HashMap::new();
        let mut categories: HashMap<i64, Vec<String>> = HashMap::new();

        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT ba.book_id, a.id, a.name FROM book_authors ba \
                 JOIN authors a ON a.id = ba.author_id WHERE ba.book_id IN ",
            );
            push_in_list(&mut qb, chunk.iter().copied());
            qb.push(" ORDER BY ba.rowid");
            let author_links: Vec<(i64, i64, String)> = qb
                .build_query_as()
                .fetch_all(&mut *self.conn)
                .await
                .context("failed to load book authors")?;
            for (book_id, id, name) in author_links {
                authors.entry(book_id).or_default().push(AuthorRef { id, name });
            }

            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT book_id, category_name FROM book_categories WHERE book_id IN ",
            );
            push_in_list(&mut qb, chunk.iter().copied());
            qb.push(" ORDER BY rowid");
            let category_links: Vec<(i64, String)> = qb
                .build_query_as()
                .fetch_all(&mut *self.conn)
                .await
                .context("failed to load book categories")?;
            for (book_id, name) in category_links {
                categories.entry(book_id).or_default().push(name);
            }
        }

        rows.into_iter()
            .map(|row| -> anyhow::Result<Book> {
                let price = Price::from_cents(row.price_cents)
                    .with_context(|| format!("book {} has a negative price", row.id))?;
                Ok(Book {
                    id: row.id,
                    title: row.title,
                    description: row.description,
                    price,
                    publication_date: row.publication_date,
                    authors: authors.remove(&row.id).unwrap_or_default(),
                    categories: categories.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn fetch_required(&mut self, id: i64) -> anyhow::Result<Book> {
        self.get_by_id(id)
            .await?
            .with_context(|| format!("book {id} missing after write"))
    }
}

/// Replace the author and category links of `book`.
async fn write_links(conn: &mut SqliteConnection, book: &Book) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM book_authors WHERE book_id = ?")
        .bind(book.id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM book_categories WHERE book_id = ?")
        .bind(book.id)
        .execute(&mut *conn)
        .await?;

    for author in &book.authors {
        sqlx::query("INSERT OR IGNORE INTO book_authors (book_id, author_id) VALUES (?, ?)")
            .bind(book.id)
            .bind(author.id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("failed to link author {} to book {}", author.id, book.id))?;
    }
    for category in &book.categories {
        sqlx::query("INSERT OR IGNORE INTO book_categories (book_id, category_name) VALUES (?, ?)")
            .bind(book.id)
            .bind(category)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("failed to link category '{category}' to book {}", book.id))?;
    }

    Ok(())
}

#[async_trait]
impl Repository<Book, i64> for BooksRepository<'_> {
    async fn get_all(&mut self) -> anyhow::Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(&format!("{SELECT_BOOKS} ORDER BY id"))
            .fetch_all(&mut *self.conn)
            .await
            .context("failed to list books")?;
        self.hydrate(rows).await
    }

    async fn get_by_id(&mut self, id: i64) -> anyhow::Result<Option<Book>> {
        let row: Option<BookRow> = sqlx::query_as(&format!("{SELECT_BOOKS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await
            .with_context(|| format!("failed to load book {id}"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn add(&mut self, mut book: Book) -> anyhow::Result<Book> {
        let mut tx = self.conn.begin().await?;

        book.id = sqlx::query(
            "INSERT INTO books (title, description, price_cents, publication_date) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.price.cents())
        .bind(book.publication_date)
        .execute(&mut *tx)
        .await
        .context("failed to insert book")?
        .last_insert_rowid();

        write_links(&mut tx, &book).await?;
        tx.commit().await?;

        tracing::debug!(book_id = book.id, "book row inserted");
        self.fetch_required(book.id).await
    }

    async fn update(&mut self, book: Book) -> anyhow::Result<Book> {
        let mut tx = self.conn.begin().await?;

        let updated = sqlx::query(
            "UPDATE books SET title = ?, description = ?, price_cents = ?, publication_date = ? \
             WHERE id = ?",
        )
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.price.cents())
        .bind(book.publication_date)
        .bind(book.id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to update book {}", book.id))?
        .rows_affected();
        if updated == 0 {
            anyhow::bail!("book {} does not exist", book.id);
        }

        write_links(&mut tx, &book).await?;
        tx.commit().await?;

        self.fetch_required(book.id).await
    }

    async fn delete(&mut self, id: i64) -> anyhow::Result<Option<Book>> {
        let Some(book) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        // Link rows go with it through ON DELETE CASCADE.
        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("failed to delete book {id}"))?;

        Ok(Some(book))
    }
}

#[async_trait]
impl BookSearch for BooksRepository<'_> {
    async fn search_by_title_prefix(&mut self, prefix: &str) -> anyhow::Result<Vec<Book>> {
        // substr comparison stays case-sensitive where LIKE would not.
        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            "{SELECT_BOOKS} WHERE substr(title, 1, length(?)) = ? ORDER BY id"
        ))
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&mut *self.conn)
        .await
        .context("failed to search books by title")?;
        self.hydrate(rows).await
    }

    async fn search_by_author_name(&mut self, name: &str) -> anyhow::Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            "{SELECT_BOOKS} WHERE EXISTS (\
                SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id \
                WHERE ba.book_id = books.id AND a.name = ?\
             ) ORDER BY id"
        ))
        .bind(name)
        .fetch_all(&mut *self.conn)
        .await
        .context("failed to search books by author")?;
        self.hydrate(rows).await
    }
}
