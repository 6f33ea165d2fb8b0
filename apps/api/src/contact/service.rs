use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::contact::flow::advance_flow;
use crate::contact::handlers::CreateContactRequest;
use crate::errors::AppError;
use crate::models::contact::{ContactRequestRow, ContactStatus};
use crate::notification::{ContactNotificationPayload, NotificationSender};

/// Retrieves the active (PENDING) contact request for a session, if any.
pub async fn get_active_request(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<ContactRequestRow>, AppError> {
    let request = sqlx::query_as::<_, ContactRequestRow>(
        "SELECT * FROM contact_requests WHERE session_id = $1 AND status = $2",
    )
    .bind(session_id)
    .bind(ContactStatus::Pending)
    .fetch_optional(pool)
    .await?;

    Ok(request)
}

/// Starts a new PENDING contact flow for the session.
///
/// `session_id` is unique at the storage layer, so concurrent first messages
/// from one session converge on a single row instead of racing.
pub async fn initialize_contact_flow(
    pool: &PgPool,
    session_id: &str,
) -> Result<ContactRequestRow, AppError> {
    let request = sqlx::query_as::<_, ContactRequestRow>(
        r#"
        INSERT INTO contact_requests (session_id)
        VALUES ($1)
        ON CONFLICT (session_id) DO UPDATE SET updated_at = now()
        RETURNING *
        "#,
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;

    info!("New contact flow started for session: {session_id}");
    Ok(request)
}

/// Advances the data-collection flow with one user message and returns the
/// next question or the confirmation text.
///
/// Persistence errors propagate — contact data must not be silently lost.
/// Notification failures never do.
pub async fn process_contact_flow(
    pool: &PgPool,
    notifier: &dyn NotificationSender,
    mut request: ContactRequestRow,
    message: &str,
) -> Result<String, AppError> {
    let outcome = advance_flow(&mut request, message);

    if outcome.persist {
        sqlx::query(
            r#"
            UPDATE contact_requests
            SET name = $1, phone = $2, email = $3, contact_date = $4,
                status = $5, updated_at = now()
            WHERE id = $6
            "#,
        )
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(&request.contact_date)
        .bind(request.status)
        .bind(request.id)
        .execute(pool)
        .await?;
    }

    if outcome.notify {
        trigger_confirmation(notifier, &request).await;
    }

    Ok(outcome.reply)
}

/// Creates a contact request from the contact form: a synthetic session id,
/// all fields at once, completed immediately.
pub async fn create_contact(
    pool: &PgPool,
    notifier: &dyn NotificationSender,
    form: &CreateContactRequest,
) -> Result<ContactRequestRow, AppError> {
    let request = sqlx::query_as::<_, ContactRequestRow>(
        r#"
        INSERT INTO contact_requests (session_id, name, phone, email, contact_date, message, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&form.name)
    .bind(&form.phone)
    .bind(&form.email)
    .bind(&form.meeting_datetime)
    .bind(&form.message)
    .bind(ContactStatus::Completed)
    .fetch_one(pool)
    .await?;

    trigger_confirmation(notifier, &request).await;

    Ok(request)
}

/// Best-effort confirmation email. Delivery failures are logged and dropped —
/// contact capture must succeed even when email delivery does not.
async fn trigger_confirmation(notifier: &dyn NotificationSender, request: &ContactRequestRow) {
    let payload = ContactNotificationPayload {
        name: request.name.clone().unwrap_or_default(),
        email: request.email.clone().unwrap_or_default(),
        phone: request.phone.clone().unwrap_or_default(),
        contact_date: request.contact_date.clone().unwrap_or_default(),
        message: request.message.clone(),
    };

    if notifier.send_confirmation(&payload).await {
        info!("Confirmation email sent for session: {}", request.session_id);
    } else {
        error!(
            "Failed to send confirmation email for session: {}",
            request.session_id
        );
    }
}
