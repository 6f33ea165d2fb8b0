use crate::notification::ContactNotificationPayload;

/// HTML body of the confirmation email sent to a prospect.
pub fn confirmation_template(payload: &ContactNotificationPayload) -> String {
    let message_row = match &payload.message {
        Some(message) => format!("<li><b>Mensaje:</b> {message}</li>"),
        None => String::new(),
    };

    format!(
        r#"
      <div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #eaeaea; border-radius: 10px;">
        <h2 style="color: #2c3e50;">¡Hola, {name}! 👋</h2>
        <p style="color: #34495e; font-size: 16px;">
          Gracias por contactarme a través de mi asistente virtual. He recibido tu solicitud y estos son los datos que registramos:
        </p>
        <ul style="background-color: #f8f9fa; padding: 15px 30px; border-radius: 5px; color: #2c3e50;">
          <li><b>Teléfono:</b> {phone}</li>
          <li><b>Correo:</b> {email}</li>
          <li><b>Preferencia de reunión:</b> {contact_date}</li>
          {message_row}
        </ul>
        <p style="color: #34495e; font-size: 16px;">
          Me pondré en contacto contigo lo antes posible para confirmar nuestra reunión.
        </p>
        <hr style="border: none; border-top: 1px solid #eaeaea; margin: 20px 0;" />
        <p style="color: #7f8c8d; font-size: 14px;">
          Saludos cordiales,<br>
          <strong>Enrique Lazo Bello</strong><br>
          <em>Senior Full Stack Developer</em>
        </p>
      </div>
    "#,
        name = payload.name,
        phone = payload.phone,
        email = payload.email,
        contact_date = payload.contact_date,
        message_row = message_row,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(message: Option<&str>) -> ContactNotificationPayload {
        ContactNotificationPayload {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: "987654321".to_string(),
            contact_date: "Lunes 15 a las 10am".to_string(),
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn test_template_includes_all_fields() {
        let html = confirmation_template(&payload(None));
        assert!(html.contains("¡Hola, Ana!"));
        assert!(html.contains("987654321"));
        assert!(html.contains("ana@example.com"));
        assert!(html.contains("Lunes 15 a las 10am"));
    }

    #[test]
    fn test_optional_message_included_when_present() {
        let html = confirmation_template(&payload(Some("Me interesa el puesto")));
        assert!(html.contains("<li><b>Mensaje:</b> Me interesa el puesto</li>"));
    }

    #[test]
    fn test_optional_message_omitted_when_absent() {
        let html = confirmation_template(&payload(None));
        assert!(!html.contains("Mensaje:"));
    }
}
