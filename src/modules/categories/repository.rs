use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection};

use super::models::Category;
use crate::repository::{push_in_list, Repository, IN_LIST_CHUNK};

pub struct CategoriesRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CategoriesRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    async fn hydrate(&mut self, names: Vec<String>) -> anyhow::Result<Vec<Category>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut books: HashMap<String, Vec<i64>> = HashMap::new();
        for chunk in names.chunks(IN_LIST_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT category_name, book_id FROM book_categories WHERE category_name IN ",
            );
            push_in_list(&mut qb, chunk.iter().cloned());
            qb.push(" ORDER BY rowid");
            let links: Vec<(String, i64)> = qb
                .build_query_as()
                .fetch_all(&mut *self.conn)
                .await
                .context("failed to load category books")?;

            for (name, book_id) in links {
                books.entry(name).or_default().push(book_id);
            }
        }

        Ok(names
            .into_iter()
            .map(|name| Category {
                book_ids: books.remove(&name).unwrap_or_default(),
                name,
            })
            .collect())
    }
}

async fn write_links(conn: &mut SqliteConnection, category: &Category) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM book_categories WHERE category_name = ?")
        .bind(&category.name)
        .execute(&mut *conn)
        .await?;

    for book_id in &category.book_ids {
        sqlx::query("INSERT OR IGNORE INTO book_categories (book_id, category_name) VALUES (?, ?)")
            .bind(book_id)
            .bind(&category.name)
            .execute(&mut *conn)
            .await
            .with_context(|| {
                format!("failed to link book {book_id} to category '{}'", category.name)
            })?;
    }
    Ok(())
}

#[async_trait]
impl Repository<Category, String> for CategoriesRepository<'_> {
    async fn get_all(&mut self) -> anyhow::Result<Vec<Category>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM categories ORDER BY name")
            .fetch_all(&mut *self.conn)
            .await
            .context("failed to list categories")?;
        self.hydrate(names).await
    }

    async fn get_by_id(&mut self, name: String) -> anyhow::Result<Option<Category>> {
        let found: Option<String> = sqlx::query_scalar("SELECT name FROM categories WHERE name = ?")
            .bind(&name)
            .fetch_optional(&mut *self.conn)
            .await
            .with_context(|| format!("failed to load category '{name}'"))?;

        match found {
            Some(name) => Ok(self.hydrate(vec![name]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn add(&mut self, category: Category) -> anyhow::Result<Category> {
        let mut tx = self.conn.begin().await?;

        sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(&category.name)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert category '{}'", category.name))?;
        write_links(&mut tx, &category).await?;
        tx.commit().await?;

        tracing::debug!(category = %category.name, "category row inserted");
        self.get_by_id(category.name.clone())
            .await?
            .with_context(|| format!("category '{}' missing after insert", category.name))
    }

    async fn update(&mut self, category: Category) -> anyhow::Result<Category> {
        let mut tx = self.conn.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = ?")
            .bind(&category.name)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            anyhow::bail!("category '{}' does not exist", category.name);
        }

        write_links(&mut tx, &category).await?;
        tx.commit().await?;

        self.get_by_id(category.name.clone())
            .await?
            .with_context(|| format!("category '{}' missing after update", category.name))
    }

    async fn delete(&mut self, name: String) -> anyhow::Result<Option<Category>> {
        let Some(category) = self.get_by_id(name).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM categories WHERE name = ?")
            .bind(&category.name)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("failed to delete category '{}'", category.name))?;

        Ok(Some(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::migrated_db;

    fn category(name: &str) -> Category {
        Category {
            name: name.to_string(),
            book_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn names_are_unique_keys() {
        let db = migrated_db().await;
        let mut session = db.session().await.unwrap();
        let mut repo = CategoriesRepository::new(&mut session);

        repo.add(category("Fiction")).await.unwrap();
        assert!(repo.add(category("Fiction")).await.is_err());
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_book_set_and_delete_returns_removed() {
        let db = migrated_db().await;
        let mut session = db.session().await.unwrap();
        let book_id = sqlx::query(
            "INSERT INTO books (title, description, price_cents, publication_date) \
             VALUES ('Dune', 'd', 999, '1965-08-01')",
        )
        .execute(&mut *session)
        .await
        .unwrap()
        .last_insert_rowid();

        let mut repo = CategoriesRepository::new(&mut session);
        repo.add(category("Science Fiction")).await.unwrap();

        let mut linked = category("Science Fiction");
        linked.book_ids = vec![book_id];
        let updated = repo.update(linked).await.unwrap();
        assert_eq!(updated.book_ids, vec![book_id]);

        let removed = repo.delete("Science Fiction".to_string()).await.unwrap();
        assert_eq!(removed.map(|c| c.book_ids), Some(vec![book_id]));
        assert!(repo
            .get_by_id("Science Fiction".to_string())
            .await
            .unwrap()
            .is_none());
        assert!(repo.delete("Science Fiction".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_missing_category_fails() {
        let db = migrated_db().await;
        let mut session = db.session().await.unwrap();

        let result = CategoriesRepository::new(&mut session)
            .update(category("Poetry"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn get_all_spans_many_link_batches() {
        let db = migrated_db().await;
        let mut session = db.session().await.unwrap();
        sqlx::query(
            "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 33000) \
             INSERT INTO categories (name) SELECT printf('C%05d', n) FROM seq",
        )
        .execute(&mut *session)
        .await
        .unwrap();

        let all = CategoriesRepository::new(&mut session).get_all().await.unwrap();
        assert_eq!(all.len(), 33_000);
        assert_eq!(all[0].name, "C00001");
        assert!(all.iter().all(|c| c.book_ids.is_empty()));
    }
}
