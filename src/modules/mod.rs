pub mod authors;
pub mod books;
pub mod categories;

use bookstore_kernel::ModuleRegistry;

/// Register the catalog modules with the registry
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(authors::create_module());
    registry.register(books::create_module());
    registry.register(categories::create_module());
}

/// A registry holding every catalog module
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry);
    registry
}


#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_db::Database;

    #[test]
    fn all_catalog_modules_are_registered() {
        let registry = registry();
        assert_eq!(registry.module_count(), 3);
        for name in ["authors", "books", "categories"] {
            assert!(registry.get_module(name).is_some(), "{name} missing");
        }
    }

    #[tokio::test]
    async fn schema_applies_once() {
        let db = Database::in_memory().await.unwrap();
        let migrations = registry().collect_migrations();

        assert_eq!(db.apply_migrations(&migrations).await.unwrap(), 3);
        assert_eq!(db.apply_migrations(&migrations).await.unwrap(), 0);
    }
}
