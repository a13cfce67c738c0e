//! Data shared by every rendered page.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Datelike, Utc};

use crate::error::{AppError, Result};
use crate::middleware::session::keys;
use crate::middleware::{CsrfToken, RequestContext, SessionHandle};

/// Fields every page template can read through `page`.
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    pub current_year: i32,
    pub is_authenticated: bool,
    pub csrf_token: String,
    flash: Option<String>,
}

impl TemplateData {
    /// The one-shot notice for this page, if any.
    #[must_use]
    pub fn flash(&self) -> Option<&str> {
        self.flash.as_deref()
    }
}

/// Everything a page handler needs to build [`TemplateData`].
pub struct ViewContext {
    session: SessionHandle,
    context: RequestContext,
    csrf: CsrfToken,
}

impl ViewContext {
    /// Build the page data. Consumes the session's flash message, so call
    /// this only for a response that will actually render a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn data(&self) -> Result<TemplateData> {
        Ok(TemplateData {
            current_year: Utc::now().year(),
            is_authenticated: self.context.is_authenticated(),
            csrf_token: self.csrf.value().to_owned(),
            flash: self.session.pop_string(keys::FLASH).await?,
        })
    }

    /// The request's session.
    #[must_use]
    pub const fn session(&self) -> &SessionHandle {
        &self.session
    }
}

impl<S> FromRequestParts<S> for ViewContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let session = SessionHandle::from_request_parts(parts, state).await?;
        let Ok(context) = RequestContext::from_request_parts(parts, state).await;
        let Ok(csrf) = CsrfToken::from_request_parts(parts, state).await;

        Ok(Self {
            session,
            context,
            csrf,
        })
    }
}
