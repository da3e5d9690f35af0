use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection};
use time::Date;

use super::models::{Author, BookRef};
use crate::repository::{push_in_list, Repository, IN_LIST_CHUNK};

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: i64,
    name: String,
    date_of_birth: Date,
}

pub struct AuthorsRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AuthorsRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    async fn hydrate(&mut self, rows: Vec<AuthorRow>) -> anyhow::Result<Vec<Author>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut books: HashMap<i64, Vec<BookRef>> = HashMap::new();

        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT ba.author_id, b.id, b.title FROM book_authors ba \
                 JOIN books b ON b.id = ba.book_id WHERE ba.author_id IN ",
            );
            push_in_list(&mut qb, chunk.iter().copied());
            qb.push(" ORDER BY ba.rowid");
            let links: Vec<(i64, i64, String)> = qb
                .build_query_as()
                .fetch_all(&mut *self.conn)
                .await
                .context("failed to load author books")?;

            for (author_id, id, title) in links {
                books.entry(author_id).or_default().push(BookRef { id, title });
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| Author {
                books: books.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                date_of_birth: row.date_of_birth,
            })
            .collect())
    }

    async fn write_links(conn: &mut SqliteConnection, author: &Author) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM book_authors WHERE author_id = ?")
            .bind(author.id)
            .execute(&mut *conn)
            .await?;

        for book in &author.books {
            sqlx::query("INSERT OR IGNORE INTO book_authors (book_id, author_id) VALUES (?, ?)")
                .bind(book.id)
                .bind(author.id)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("failed to link book {} to author {}", book.id, author.id))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<Author, i64> for AuthorsRepository<'_> {
    async fn get_all(&mut self) -> anyhow::Result<Vec<Author>> {
        let rows: Vec<AuthorRow> =
            sqlx::query_as("SELECT id, name, date_of_birth FROM authors ORDER BY id")
                .fetch_all(&mut *self.conn)
                .await
                .context("failed to list authors")?;
        self.hydrate(rows).await
    }

    async fn get_by_id(&mut self, id: i64) -> anyhow::Result<Option<Author>> {
        let row: Option<AuthorRow> =
            sqlx::query_as("SELECT id, name, date_of_birth FROM authors WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await
                .with_context(|| format!("failed to load author {id}"))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn add(&mut self, mut author: Author) -> anyhow::Result<Author> {
        let mut tx = self.conn.begin().await?;

        author.id = sqlx::query("INSERT INTO authors (name, date_of_birth) VALUES (?, ?)")
            .bind(&author.name)
            .bind(author.date_of_birth)
            .execute(&mut *tx)
            .await
            .context("failed to insert author")?
            .last_insert_rowid();

        Self::write_links(&mut tx, &author).await?;
        tx.commit().await?;

        tracing::debug!(author_id = author.id, "author row inserted");
        self.get_by_id(author.id)
            .await?
            .with_context(|| format!("author {} missing after insert", author.id))
    }

    async fn update(&mut self, author: Author) -> anyhow::Result<Author> {
        let mut tx = self.conn.begin().await?;

        let updated = sqlx::query("UPDATE authors SET name = ?, date_of_birth = ? WHERE id = ?")
            .bind(&author.name)
            .bind(author.date_of_birth)
            .bind(author.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to update author {}", author.id))?
            .rows_affected();
        if updated == 0 {
            anyhow::bail!("author {} does not exist", author.id);
        }

        Self::write_links(&mut tx, &author).await?;
        tx.commit().await?;

        self.get_by_id(author.id)
            .await?
            .with_context(|| format!("author {} missing after update", author.id))
    }

    async fn delete(&mut self, id: i64) -> anyhow::Result<Option<Author>> {
        let Some(author) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("failed to delete author {id}"))?;

        Ok(Some(author))
    }
}
