//! Snippet route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use snippetbox_core::{SnippetId, SnippetLifetime};

use super::parse_form;
use crate::error::{AppError, Result};
use crate::middleware::session::keys;
use crate::models::Snippet;
use crate::state::AppState;
use crate::validator::{Validator, max_chars, not_blank, permitted_value};
use crate::views::{TemplateData, ViewContext};

/// Longest title accepted, in characters.
const MAX_TITLE_CHARS: usize = 100;

// =============================================================================
// Form Types
// =============================================================================

/// Create-snippet form. `expires` is required: a missing or non-numeric value
/// is a malformed request, not a validation error.
#[derive(Debug, Default, Deserialize)]
pub struct SnippetCreateForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub expires: i32,
    #[serde(skip)]
    pub validator: Validator,
}

// =============================================================================
// Templates
// =============================================================================

/// Snippet page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/view.html")]
pub struct ViewTemplate {
    pub page: TemplateData,
    pub snippet: Snippet,
}

/// Create-snippet page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/create.html")]
pub struct CreateTemplate {
    pub page: TemplateData,
    pub form: SnippetCreateForm,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display a single snippet.
///
/// A non-numeric or non-positive ID is a 404, same as a missing or expired
/// snippet.
#[instrument(skip_all)]
pub async fn view(
    State(state): State<AppState>,
    view: ViewContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id: SnippetId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("snippet {id}")))?;

    let snippet = state.snippets().get(id).await?;

    Ok(ViewTemplate {
        page: view.data().await?,
        snippet,
    })
}

/// Display the create-snippet form.
pub async fn create_page(view: ViewContext) -> Result<impl IntoResponse> {
    Ok(CreateTemplate {
        page: view.data().await?,
        form: SnippetCreateForm {
            expires: SnippetLifetime::default().days(),
            ..SnippetCreateForm::default()
        },
    })
}

/// Handle create-snippet form submission.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    view: ViewContext,
    form: std::result::Result<Form<SnippetCreateForm>, FormRejection>,
) -> Result<Response> {
    let mut form = parse_form(form)?;

    form.validator.check_field(
        not_blank(&form.title),
        "title",
        "This field cannot be blank",
    );
    form.validator.check_field(
        max_chars(&form.title, MAX_TITLE_CHARS),
        "title",
        "This field cannot be more than 100 characters long",
    );
    form.validator.check_field(
        not_blank(&form.content),
        "content",
        "This field cannot be blank",
    );
    form.validator.check_field(
        permitted_value(&form.expires, &SnippetLifetime::PERMITTED_DAYS),
        "expires",
        "This field must equal 1, 7 or 365",
    );

    let lifetime = match SnippetLifetime::from_days(form.expires) {
        Some(lifetime) if form.validator.valid() => lifetime,
        _ => {
            let page = view.data().await?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                CreateTemplate { page, form },
            )
                .into_response());
        }
    };

    let id = state
        .snippets()
        .insert(&form.title, &form.content, lifetime)
        .await?;
    tracing::info!(snippet_id = %id, days = lifetime.days(), "Snippet created");

    view.session()
        .put(keys::FLASH, "Snippet successfully created!")
        .await?;

    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}
