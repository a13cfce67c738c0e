//! Signup, login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use snippetbox_core::Email;

use super::parse_form;
use crate::error::Result;
use crate::middleware::session::keys;
use crate::services::auth::AuthError;
use crate::state::AppState;
use crate::validator::{Validator, matches, min_chars, not_blank};
use crate::views::{TemplateData, ViewContext};

/// Shortest password accepted at signup, in characters.
const MIN_PASSWORD_CHARS: usize = 8;

const BLANK: &str = "This field cannot be blank";
const BAD_EMAIL: &str = "This field must be a valid email address";

// =============================================================================
// Form Types
// =============================================================================

/// Signup form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub validator: Validator,
}

/// Login form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub validator: Validator,
}

// =============================================================================
// Templates
// =============================================================================

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub page: TemplateData,
    pub form: SignupForm,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub page: TemplateData,
    pub form: LoginForm,
}

// =============================================================================
// Signup Routes
// =============================================================================

/// Display the signup form.
pub async fn signup_page(view: ViewContext) -> Result<impl IntoResponse> {
    Ok(SignupTemplate {
        page: view.data().await?,
        form: SignupForm::default(),
    })
}

/// Handle signup form submission.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    view: ViewContext,
    form: std::result::Result<Form<SignupForm>, FormRejection>,
) -> Result<Response> {
    let mut form = parse_form(form)?;

    form.validator
        .check_field(not_blank(&form.name), "name", BLANK);
    let email = check_email(&mut form.validator, &form.email);
    form.validator
        .check_field(not_blank(&form.password), "password", BLANK);
    form.validator.check_field(
        min_chars(&form.password, MIN_PASSWORD_CHARS),
        "password",
        "This field must be at least 8 characters long",
    );

    let email = match email {
        Some(email) if form.validator.valid() => email,
        _ => return render_signup(&view, form, StatusCode::UNPROCESSABLE_ENTITY).await,
    };

    match state
        .auth()
        .register(&form.name, &email, &form.password)
        .await
    {
        Ok(user_id) => {
            tracing::info!(%user_id, "User signed up");
        }
        Err(AuthError::UserAlreadyExists) => {
            form.validator
                .add_field_error("email", "Email address is already in use");
            return render_signup(&view, form, StatusCode::BAD_REQUEST).await;
        }
        Err(e) => return Err(e.into()),
    }

    view.session()
        .put(keys::FLASH, "User signed up successfully")
        .await?;

    Ok(Redirect::to("/user/login").into_response())
}

async fn render_signup(
    view: &ViewContext,
    form: SignupForm,
    status: StatusCode,
) -> Result<Response> {
    let page = view.data().await?;
    Ok((status, SignupTemplate { page, form }).into_response())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login form.
pub async fn login_page(view: ViewContext) -> Result<impl IntoResponse> {
    Ok(LoginTemplate {
        page: view.data().await?,
        form: LoginForm::default(),
    })
}

/// Handle login form submission.
///
/// On success the session moves to a fresh ID before the user ID is written,
/// so an ID fixed by an attacker before login never becomes authenticated.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    view: ViewContext,
    form: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Result<Response> {
    let mut form = parse_form(form)?;

    let email = check_email(&mut form.validator, &form.email);
    form.validator
        .check_field(not_blank(&form.password), "password", BLANK);

    let email = match email {
        Some(email) if form.validator.valid() => email,
        _ => return render_login(&view, form).await,
    };

    let user_id = match state.auth().authenticate(&email, &form.password).await {
        Ok(user_id) => user_id,
        Err(AuthError::InvalidCredentials) => {
            form.validator
                .add_non_field_error("Email or password is incorrect");
            return render_login(&view, form).await;
        }
        Err(e) => return Err(e.into()),
    };

    let session = view.session();
    session.renew_token().await?;
    session.put(keys::AUTHENTICATED_USER_ID, user_id).await?;
    tracing::info!(%user_id, "User logged in");

    Ok(Redirect::to("/snippet/create").into_response())
}

async fn render_login(view: &ViewContext, form: LoginForm) -> Result<Response> {
    let page = view.data().await?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, LoginTemplate { page, form }).into_response())
}

// =============================================================================
// Logout Route
// =============================================================================

/// Log the user out.
#[instrument(skip_all)]
pub async fn logout(view: ViewContext) -> Result<Response> {
    let session = view.session();
    session.renew_token().await?;
    session.remove(keys::AUTHENTICATED_USER_ID).await?;
    session.put(keys::FLASH, "Logged out successfully").await?;

    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate the raw email field, returning the parsed address when it passes.
fn check_email(validator: &mut Validator, raw: &str) -> Option<Email> {
    validator.check_field(not_blank(raw), "email", BLANK);
    validator.check_field(matches(raw, Email::pattern()), "email", BAD_EMAIL);

    match Email::parse(raw) {
        Ok(email) => Some(email),
        Err(_) => {
            validator.add_field_error("email", BAD_EMAIL);
            None
        }
    }
}
