//! Generic data access over one entity type.

use std::collections::HashSet;
use std::hash::Hash;

use async_trait::async_trait;
use sqlx::{Encode, QueryBuilder, Sqlite, Type};

/// CRUD over entities of type `T` keyed by `K`.
///
/// Implementations borrow the request's connection. Relationship collections
/// are loaded eagerly on every read; each write commits before returning.
#[async_trait]
pub trait Repository<T, K>: Send
where
    T: Send + 'static,
    K: Send + 'static,
{
    async fn get_all(&mut self) -> anyhow::Result<Vec<T>>;

    async fn get_by_id(&mut self, id: K) -> anyhow::Result<Option<T>>;

    /// Insert `entity` and its relationship rows, returning it as stored
    /// (with the generated identifier).
    async fn add(&mut self, entity: T) -> anyhow::Result<T>;

    /// Replace scalar fields and relationship sets of an existing row.
    ///
    /// Relationship references must already point at existing rows.
    async fn update(&mut self, entity: T) -> anyhow::Result<T>;

    /// Remove the row and its relationship rows; `None` if it did not exist.
    async fn delete(&mut self, id: K) -> anyhow::Result<Option<T>>;
}

/// Keep the first occurrence of every item, preserving order.
pub fn first_occurrences<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Upper bound on values bound by one `IN (...)` list.
///
/// SQLite rejects statements with more than 32766 host parameters; callers
/// hydrating an unbounded row set split their keys into chunks of this size.
pub(crate) const IN_LIST_CHUNK: usize = 500;

/// Append `(?, ?, ...)` with one bound parameter per value.
pub(crate) fn push_in_list<'args, T>(
    qb: &mut QueryBuilder<'args, Sqlite>,
    values: impl IntoIterator<Item = T>,
) where
    T: 'args + Encode<'args, Sqlite> + Type<Sqlite> + Send,
{
    qb.push("(");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrences_drops_later_duplicates() {
        assert_eq!(first_occurrences([3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert_eq!(
            first_occurrences(["Fiction".to_string(), "Fiction".to_string()]),
            vec!["Fiction".to_string()]
        );
    }

    #[test]
    fn in_list_binds_every_value() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM books WHERE id IN ");
        push_in_list(&mut qb, [1_i64, 2, 3]);
        assert_eq!(qb.sql(), "SELECT id FROM books WHERE id IN (?, ?, ?)");
    }
}
