use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    app::AppState,
    auth::verify_password,
    store::UserDao,
};

use super::{
    error::{ApiError, FieldErrors},
    extract::bearer_token,
};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("compile email pattern")
});

const EMAIL_LENGTH: std::ops::RangeInclusive<usize> = 6..=100;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RegisterForm {
    email: String,
    password: String,
    confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct RegisteredUser {
    user_id: i64,
    email: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    token_type: &'static str,
    user_id: i64,
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.push("email", "Email address is required!");
        return;
    }
    if !EMAIL_LENGTH.contains(&email.chars().count()) {
        errors.push("email", "Accepted email addresses are 6-100 characters!");
    }
    if !EMAIL_PATTERN.is_match(email) {
        errors.push("email", "Not a valid email address!");
    }
}

fn validate_registration(form: &RegisterForm) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    check_email(form.email.trim(), &mut errors);

    if form.password.is_empty() {
        errors.push("password", "Password is required!");
    } else if form.password != form.confirm_password {
        errors.push("password", "Both passwords must match!");
    }

    if form.confirm_password.is_empty() {
        errors.push("confirm_password", "Confirm password required!");
    }

    errors.into_result()
}

fn validate_login(form: &LoginForm) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    let email = form.email.trim();
    if email.is_empty() {
        errors.push("email", "Email address is required!");
    } else if !EMAIL_LENGTH.contains(&email.chars().count()) {
        errors.push("email", "Accepted email addresses are 6-100 characters!");
    }
    if form.password.is_empty() {
        errors.push("password", "Password is required!");
    }
    errors.into_result()
}

/// `POST /auth/register`
pub(crate) async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<impl IntoResponse, ApiError> {
    validate_registration(&form)?;

    let email = form.email.trim().to_string();
    let hasher = state.password_hasher();
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&form.password))
        .await
        .context("password hashing task failed")?;
    let Some(user_id) = state.store().create_user(&email, &password_hash).await? else {
        return Err(ApiError::Conflict(FieldErrors::single(
            "registration",
            format!("User {email} is already registered."),
        )));
    };

    info!(user_id, "user registered");
    Ok((StatusCode::CREATED, Json(RegisteredUser { user_id, email })))
}

/// `POST /auth/login`
pub(crate) async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    validate_login(&form)?;

    let Some(user) = state.store().find_user_by_email(form.email.trim()).await? else {
        return Err(ApiError::Unauthorized(FieldErrors::single(
            "email",
            "Incorrect email.",
        )));
    };
    let stored = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&stored, &form.password))
        .await
        .context("password verification task failed")?;
    if !matches {
        return Err(ApiError::Unauthorized(FieldErrors::single(
            "password",
            "Incorrect password.",
        )));
    }

    let token = state.sessions().issue(user.user_id);
    info!(user_id = user.user_id, "user logged in");
    Ok(Json(LoginResponse {
        token: token.to_string(),
        token_type: "Bearer",
        user_id: user.user_id,
    }))
}

/// `POST /auth/logout`. Always succeeds; unknown tokens are ignored.
pub(crate) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        if state.sessions().revoke(token) {
            info!("session revoked");
        }
    }
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    fn field_errors(result: Result<(), ApiError>) -> serde_json::Value {
        match result {
            Err(ApiError::Validation(errors)) => serde_json::to_value(errors).unwrap(),
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_valid_registration() {
        assert!(validate_registration(&registration("ada@example.com", "pw", "pw")).is_ok());
    }

    #[test]
    fn missing_email_stops_the_email_checks() {
        let errors = field_errors(validate_registration(&registration("", "pw", "pw")));
        assert_eq!(errors["email"], serde_json::json!(["Email address is required!"]));
    }

    #[test]
    fn short_malformed_email_reports_both_problems() {
        let errors = field_errors(validate_registration(&registration("a@b", "pw", "pw")));
        assert_eq!(
            errors["email"],
            serde_json::json!([
                "Accepted email addresses are 6-100 characters!",
                "Not a valid email address!"
            ])
        );
    }

    #[test]
    fn mismatched_and_missing_passwords() {
        let errors = field_errors(validate_registration(&registration(
            "ada@example.com",
            "one",
            "two",
        )));
        assert_eq!(errors["password"], serde_json::json!(["Both passwords must match!"]));

        let errors = field_errors(validate_registration(&registration("ada@example.com", "", "")));
        assert_eq!(errors["password"], serde_json::json!(["Password is required!"]));
        assert_eq!(
            errors["confirm_password"],
            serde_json::json!(["Confirm password required!"])
        );
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = field_errors(validate_login(&LoginForm::default()));
        assert_eq!(errors["email"], serde_json::json!(["Email address is required!"]));
        assert_eq!(errors["password"], serde_json::json!(["Password is required!"]));
    }
}
