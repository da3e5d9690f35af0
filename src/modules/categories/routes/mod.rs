//! HTTP handlers for `/api/categories`.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::SqliteConnection;

use super::models::{Category, CategoryDto, CreateCategoryDto, UpdateCategoryDto};
use super::repository::CategoriesRepository;
use crate::modules::books::repository::BooksRepository;
use crate::repository::{first_occurrences, Repository};
use crate::utils::path_segment;
use bookstore_http::{AppError, DbSession, JsonBody};

async fn resolve_books(conn: &mut SqliteConnection, book_ids: &[i64]) -> Result<Vec<i64>, AppError> {
    let mut books = BooksRepository::new(conn);
    let mut resolved = Vec::with_capacity(book_ids.len());

    for id in first_occurrences(book_ids.iter().copied()) {
        if books.get_by_id(id).await?.is_none() {
            return Err(AppError::bad_request(format!("Book with id '{id}' not found.")));
        }
        resolved.push(id);
    }

    Ok(resolved)
}

/// List categories
#[utoipa::path(
    get,
    path = "/",
    tag = "Categories",
    responses((status = 200, description = "All categories", body = Vec<CategoryDto>))
)]
pub async fn list_categories(mut session: DbSession) -> Result<Json<Vec<CategoryDto>>, AppError> {
    let categories = CategoriesRepository::new(&mut session).get_all().await?;
    Ok(Json(categories.into_iter().map(CategoryDto::from).collect()))
}

/// Get a category by name
#[utoipa::path(
    get,
    path = "/{name}",
    tag = "Categories",
    params(("name" = String, Path, description = "Category name")),
    responses(
        (status = 200, description = "Category found", body = CategoryDto),
        (status = 404, description = "No category with this name")
    )
)]
pub async fn get_category(
    Path(name): Path<String>,
    mut session: DbSession,
) -> Result<Json<CategoryDto>, AppError> {
    let category = CategoriesRepository::new(&mut session)
        .get_by_id(name)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(category.into()))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/",
    tag = "Categories",
    request_body = CreateCategoryDto,
    responses(
        (status = 201, description = "Category created", body = CategoryDto),
        (status = 400, description = "Missing name or unknown book"),
        (status = 409, description = "A category with this name already exists")
    )
)]
pub async fn create_category(
    mut session: DbSession,
    JsonBody(body): JsonBody<CreateCategoryDto>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::bad_request("The name field is required."));
    }

    if CategoriesRepository::new(&mut session)
        .get_by_id(body.name.clone())
        .await?
        .is_some()
    {
        return Err(AppError::conflict(
            vec![json!({ "field": "name", "value": body.name })],
            format!("Category '{}' already exists.", body.name),
        ));
    }

    let book_ids = resolve_books(&mut session, &body.book_ids).await?;
    let category = CategoriesRepository::new(&mut session)
        .add(Category {
            name: body.name,
            book_ids,
        })
        .await?;

    tracing::info!(category = %category.name, "category created");
    let location = format!("/api/categories/{}", path_segment(&category.name));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CategoryDto::from(category)),
    ))
}

/// Replace the books of a category
#[utoipa::path(
    put,
    path = "/{name}",
    tag = "Categories",
    params(("name" = String, Path, description = "Category name")),
    request_body(content = UpdateCategoryDto, description = "Optional; an omitted body clears the book list"),
    responses(
        (status = 200, description = "Category updated", body = CategoryDto),
        (status = 400, description = "A referenced book does not exist"),
        (status = 404, description = "No category with this name")
    )
)]
pub async fn update_category(
    Path(name): Path<String>,
    mut session: DbSession,
    body: Option<JsonBody<UpdateCategoryDto>>,
) -> Result<Json<CategoryDto>, AppError> {
    let body = body.map(|JsonBody(body)| body).unwrap_or_default();

    if CategoriesRepository::new(&mut session)
        .get_by_id(name.clone())
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let book_ids = resolve_books(&mut session, &body.book_ids).await?;
    let category = CategoriesRepository::new(&mut session)
        .update(Category { name, book_ids })
        .await?;

    tracing::info!(category = %category.name, "category updated");
    Ok(Json(category.into()))
}

/// Delete a category
#[utoipa::path(
    delete,
    path = "/{name}",
    tag = "Categories",
    params(("name" = String, Path, description = "Category name")),
    responses(
        (status = 200, description = "Category deleted; body is the removed category", body = CategoryDto),
        (status = 404, description = "No category with this name")
    )
)]
pub async fn delete_category(
    Path(name): Path<String>,
    mut session: DbSession,
) -> Result<Json<CategoryDto>, AppError> {
    let removed = CategoriesRepository::new(&mut session)
        .delete(name)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(category = %removed.name, "category deleted");
    Ok(Json(removed.into()))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Categories",
    responses((status = 200, description = "OK", body = String))
)]
pub async fn health_check() -> &'static str {
    "categories module is healthy"
}
