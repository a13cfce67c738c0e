//! Home, about, liveness and not-found handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::Snippet;
use crate::state::AppState;
use crate::views::{TemplateData, ViewContext};

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub page: TemplateData,
    pub snippets: Vec<Snippet>,
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub page: TemplateData,
}

/// Display the latest snippets.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, view: ViewContext) -> Result<impl IntoResponse> {
    let snippets = state.snippets().latest().await?;

    Ok(HomeTemplate {
        page: view.data().await?,
        snippets,
    })
}

/// Display the about page.
pub async fn about(view: ViewContext) -> Result<impl IntoResponse> {
    Ok(AboutTemplate {
        page: view.data().await?,
    })
}

/// Liveness check.
pub async fn ping() -> &'static str {
    "OK"
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("no route".to_owned())
}
