use axum::{extract::State, Json};
use serde::Deserialize;

use crate::contact::service::create_contact;
use crate::errors::AppError;
use crate::models::contact::ContactRequestRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub meeting_datetime: String,
    pub message: Option<String>,
}

impl CreateContactRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::Validation("phone must not be empty".to_string()));
        }
        if self.meeting_datetime.trim().is_empty() {
            return Err(AppError::Validation(
                "meeting_datetime must not be empty".to_string(),
            ));
        }
        if !is_plausible_email(&self.email) {
            return Err(AppError::Validation(
                "email must be a valid email address".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loose shape check: one '@' with a non-empty local part and a dotted domain.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.contains(' ')
}

/// POST /contact
/// Direct contact form submission — completed immediately, no flow.
pub async fn handle_create(
    State(state): State<AppState>,
    Json(form): Json<CreateContactRequest>,
) -> Result<Json<ContactRequestRow>, AppError> {
    form.validate()?;
    let request = create_contact(&state.db, state.notifier.as_ref(), &form).await?;
    Ok(Json(request))
}
