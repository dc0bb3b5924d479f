//! Outgoing email composition
//!
//! Bodies are rendered with Askama; the HTML template escapes user input.

use crate::config::RelayConfig;
use crate::contact::mailer::MailError;
use crate::contact::validation::ContactMessage;
use askama::Template;
use serde::Serialize;

#[derive(Template)]
#[template(path = "contact_email.html")]
struct ContactEmailHtml<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "contact_email.txt")]
struct ContactEmailText<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

/// A ready-to-send email
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailEnvelope {
    pub from: String,
    pub to: String,
    /// Replies go straight to the visitor
    pub reply_to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Build the notification for a validated contact message
pub fn compose(message: &ContactMessage, config: &RelayConfig) -> Result<MailEnvelope, MailError> {
    let html = ContactEmailHtml {
        name: &message.name,
        email: &message.email,
        message: &message.message,
    }
    .render()
    .map_err(|e| MailError::Render(e.to_string()))?;

    let text = ContactEmailText {
        name: &message.name,
        email: &message.email,
        message: &message.message,
    }
    .render()
    .map_err(|e| MailError::Render(e.to_string()))?;

    // header-safe: no line breaks from the visitor's name
    let sender: String = message.name.chars().filter(|c| !c.is_control()).collect();

    Ok(MailEnvelope {
        from: format!("\"{}\" <{}>", config.from_name.replace('"', ""), config.from_address),
        to: config.recipient.clone(),
        reply_to: message.email.clone(),
        subject: format!("New contact message from {}", sender),
        html,
        text,
    })
}
