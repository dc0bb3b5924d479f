//! Contact relay
//!
//! - `validation`: form checks and address normalization
//! - `mail` (api): envelope composition with Askama templates
//! - `mailer` (api): transports

pub mod validation;

#[cfg(feature = "api")]
pub mod mail;

#[cfg(feature = "api")]
pub mod mailer;

pub use validation::{normalize_email, validate, ContactMessage, ContactRequest};

#[cfg(feature = "api")]
pub use mail::{compose, MailEnvelope};

#[cfg(feature = "api")]
pub use mailer::{mailer_from_config, HttpMailer, LogMailer, MailError, Mailer};
