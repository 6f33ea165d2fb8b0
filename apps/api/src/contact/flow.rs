//! Conversational data-collection flow for contact requests.
//!
//! The stage is derived from the first unset field in fixed order
//! name -> phone -> email -> contact_date, and a single pure transition
//! sets that field from the user's message. Keeping the transition free of
//! I/O lets the whole flow be tested without a database.

use crate::models::contact::{ContactRequestRow, ContactStatus};

pub const MSG_PHONE_QUESTION_SUFFIX: &str = "¿A qué número de celular te podemos contactar?";
pub const MSG_EMAIL_QUESTION: &str = "Entendido. ¿Cuál es tu correo electrónico?";
pub const MSG_DATE_QUESTION: &str =
    "¿Qué fecha y hora te gustaría para la reunión? (Ej: Lunes 15 a las 10am)";
pub const MSG_COMPLETED: &str = "¡Excelente! He registrado tus datos. Te hemos enviado un correo de confirmación y Enrique se pondrá en contacto contigo pronto.";
pub const MSG_ALREADY_PROCESSED: &str = "Tu solicitud ya ha sido procesada anteriormente.";

/// Explicit stage of the contact flow for a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    CollectingName,
    CollectingPhone,
    CollectingEmail,
    CollectingDate,
    Completed,
}

impl FlowStage {
    /// The first unset field decides which question comes next.
    pub fn of(request: &ContactRequestRow) -> Self {
        if request.name.is_none() {
            FlowStage::CollectingName
        } else if request.phone.is_none() {
            FlowStage::CollectingPhone
        } else if request.email.is_none() {
            FlowStage::CollectingEmail
        } else if request.contact_date.is_none() {
            FlowStage::CollectingDate
        } else {
            FlowStage::Completed
        }
    }
}

/// What the service must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub reply: String,
    /// The transition mutated the request and it must be saved.
    pub persist: bool,
    /// The flow just completed; fire the confirmation notification.
    pub notify: bool,
}

/// Applies one user message to the flow, mutating `request` in place.
///
/// Field population is monotonic: each call sets exactly the first unset
/// field to the trimmed message. The transition that sets `contact_date`
/// also flips the status to `Completed`. A request that already holds all
/// four fields is left untouched.
pub fn advance_flow(request: &mut ContactRequestRow, message: &str) -> FlowOutcome {
    let value = message.trim().to_string();

    match FlowStage::of(request) {
        FlowStage::CollectingName => {
            let reply = format!("Gracias, {value}. {MSG_PHONE_QUESTION_SUFFIX}");
            request.name = Some(value);
            FlowOutcome {
                reply,
                persist: true,
                notify: false,
            }
        }
        FlowStage::CollectingPhone => {
            request.phone = Some(value);
            FlowOutcome {
                reply: MSG_EMAIL_QUESTION.to_string(),
                persist: true,
                notify: false,
            }
        }
        FlowStage::CollectingEmail => {
            request.email = Some(value);
            FlowOutcome {
                reply: MSG_DATE_QUESTION.to_string(),
                persist: true,
                notify: false,
            }
        }
        FlowStage::CollectingDate => {
            request.contact_date = Some(value);
            request.status = ContactStatus::Completed;
            FlowOutcome {
                reply: MSG_COMPLETED.to_string(),
                persist: true,
                notify: true,
            }
        }
        FlowStage::Completed => FlowOutcome {
            reply: MSG_ALREADY_PROCESSED.to_string(),
            persist: false,
            notify: false,
        },
    }
}
