use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::template::{
    CreateTemplateData, CustomTemplate, TemplateCategory, UpdateTemplateData, MODES,
};
use crate::services::validation::{trimmed, FormValidator};

const MODE_EMAIL: &str = "email";

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TemplateListQuery {
    pub category_id: Option<Uuid>,
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub category_id: Uuid,
    pub title: String,
    pub mode_of_communication: String,
    pub subject: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub mode_of_communication: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Trimmed, non-empty, first occurrence wins
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !cleaned.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            cleaned.push(tag);
        }
    }
    cleaned
}

fn check_subject(v: &mut FormValidator, mode: &str, subject: Option<&str>) {
    if mode == MODE_EMAIL {
        v.check(
            subject.map_or(false, |s| !s.trim().is_empty()),
            "Subject is required for email templates",
        );
    }
}

async fn find_category(
    state: &AppState,
    current: &CurrentAdmin,
    id: Uuid,
) -> Result<TemplateCategory> {
    TemplateCategory::find_in_scope(&state.pool, id, &current.scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Template category not found".to_string()))
}

async fn find_template(
    state: &AppState,
    current: &CurrentAdmin,
    id: Uuid,
) -> Result<CustomTemplate> {
    CustomTemplate::find_in_scope(&state.pool, id, &current.scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))
}

/// Category names are unique within a team, ignoring case
async fn ensure_name_free(
    state: &AppState,
    current: &CurrentAdmin,
    name: &str,
    except: Option<Uuid>,
) -> Result<()> {
    let existing = TemplateCategory::find_by_name(&state.pool, name, &current.scope).await?;
    match existing {
        Some(category) if Some(category.id) != except => Err(AppError::Conflict(format!(
            "A category named '{}' already exists",
            category.name
        ))),
        _ => Ok(()),
    }
}

async fn list_categories(
    State(state): State<AppState>,
    current: CurrentAdmin,
) -> Result<ApiResponse<Vec<TemplateCategory>>> {
    let categories = TemplateCategory::list_in_scope(&state.pool, &current.scope).await?;
    Ok(ApiResponse::ok("Template categories fetched", categories))
}

async fn get_category(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<TemplateCategory>> {
    let category = find_category(&state, &current, id).await?;
    Ok(ApiResponse::ok("Template category fetched", category))
}

async fn create_category(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<CategoryRequest>,
) -> Result<ApiResponse<TemplateCategory>> {
    let name = req.name.trim();
    FormValidator::new().required("Name", name).finish()?;
    ensure_name_free(&state, &current, name, None).await?;

    let category = TemplateCategory::create(&state.pool, name, current.id()).await?;
    tracing::info!(category_id = %category.id, "Template category created");

    Ok(ApiResponse::created("Template category created", category))
}

async fn rename_category(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<ApiResponse<TemplateCategory>> {
    let name = req.name.trim();
    FormValidator::new().required("Name", name).finish()?;

    let category = find_category(&state, &current, id).await?;
    ensure_name_free(&state, &current, name, Some(category.id)).await?;

    let category = TemplateCategory::rename(&state.pool, category.id, name).await?;
    tracing::info!(category_id = %category.id, "Template category renamed");

    Ok(ApiResponse::ok("Template category updated", category))
}

async fn delete_category(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    let category = find_category(&state, &current, id).await?;

    let in_use = TemplateCategory::count_templates(&state.pool, category.id).await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Category still contains {} template(s)",
            in_use
        )));
    }

    TemplateCategory::soft_delete(&state.pool, category.id, current.id()).await?;
    tracing::info!(
        category_id = %category.id,
        deleted_by = %current.id(),
        "Template category deleted"
    );

    Ok(ApiResponse::message_only("Template category deleted"))
}

async fn list_templates(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<TemplateListQuery>,
) -> Result<ApiResponse<Vec<CustomTemplate>>> {
    let mode = trimmed(query.mode);
    let templates = CustomTemplate::list_in_scope(
        &state.pool,
        &current.scope,
        query.category_id,
        mode.as_deref(),
    )
    .await?;
    Ok(ApiResponse::ok("Templates fetched", templates))
}

async fn get_template(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<CustomTemplate>> {
    let template = find_template(&state, &current, id).await?;
    Ok(ApiResponse::ok("Template fetched", template))
}

async fn create_template(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<ApiResponse<CustomTemplate>> {
    let mut v = FormValidator::new();
    v.required("Title", &req.title)
        .required("Content", &req.content)
        .one_of("Mode of communication", &req.mode_of_communication, MODES);
    check_subject(&mut v, &req.mode_of_communication, req.subject.as_deref());
    v.finish()?;

    let category = find_category(&state, &current, req.category_id).await?;

    let template = CustomTemplate::create(
        &state.pool,
        CreateTemplateData {
            category_id: category.id,
            title: req.title.trim().to_string(),
            mode_of_communication: req.mode_of_communication,
            subject: trimmed(req.subject),
            content: req.content,
            tags: clean_tags(req.tags),
            created_by: current.id(),
        },
    )
    .await?;

    tracing::info!(template_id = %template.id, category_id = %category.id, "Template created");

    Ok(ApiResponse::created("Template created", template))
}

async fn update_template(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<ApiResponse<CustomTemplate>> {
    let template = find_template(&state, &current, id).await?;

    // Validate the template as it will look after the update
    let mode = req
        .mode_of_communication
        .clone()
        .unwrap_or_else(|| template.mode_of_communication.clone());
    let subject = req.subject.clone().or_else(|| template.subject.clone());

    let mut v = FormValidator::new();
    v.one_of("Mode of communication", &mode, MODES);
    if let Some(title) = &req.title {
        v.required("Title", title);
    }
    if let Some(content) = &req.content {
        v.required("Content", content);
    }
    check_subject(&mut v, &mode, subject.as_deref());
    v.finish()?;

    if let Some(category_id) = req.category_id {
        find_category(&state, &current, category_id).await?;
    }

    let template = CustomTemplate::update(
        &state.pool,
        template.id,
        UpdateTemplateData {
            category_id: req.category_id,
            title: trimmed(req.title),
            mode_of_communication: req.mode_of_communication,
            subject: trimmed(req.subject),
            content: req.content,
            tags: req.tags.map(clean_tags),
        },
    )
    .await?;

    tracing::info!(template_id = %template.id, updated_by = %current.id(), "Template updated");

    Ok(ApiResponse::ok("Template updated", template))
}

async fn delete_template(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    let template = find_template(&state, &current, id).await?;

    CustomTemplate::soft_delete(&state.pool, template.id, current.id()).await?;
    tracing::info!(template_id = %template.id, deleted_by = %current.id(), "Template deleted");

    Ok(ApiResponse::message_only("Template deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/template-categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/admin/template-categories/:id",
            get(get_category).put(rename_category).delete(delete_category),
        )
        .route("/api/admin/templates", get(list_templates).post(create_template))
        .route(
            "/api/admin/templates/:id",
            get(get_template).put(update_template).delete(delete_template),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_needs_subject() {
        let mut v = FormValidator::new();
        check_subject(&mut v, "email", Some("  "));
        assert!(v.finish().is_err());

        let mut v = FormValidator::new();
        check_subject(&mut v, "email", Some("Welcome to the club"));
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_text_needs_no_subject() {
        let mut v = FormValidator::new();
        check_subject(&mut v, "text", None);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_clean_tags() {
        let tags = vec![
            " welcome ".to_string(),
            "".to_string(),
            "Welcome".to_string(),
            "trial".to_string(),
        ];
        assert_eq!(clean_tags(tags), vec!["welcome", "trial"]);
    }
}
