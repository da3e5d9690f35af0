use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A category, keyed by its immutable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub book_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub name: String,
    pub book_ids: Vec<i64>,
}

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            name: category.name,
            book_ids: category.book_ids,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub book_ids: Vec<i64>,
}

/// Replacement book set for an existing category.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryDto {
    #[serde(default)]
    pub book_ids: Vec<i64>,
}
