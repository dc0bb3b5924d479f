//! Contact form validation
//!
//! Every field is trimmed first. Checks run per field in form order and stop
//! at the first failure, so each invalid field contributes one message.
//! Lengths count characters, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const MESSAGE_MIN_CHARS: usize = 10;
pub const MESSAGE_MAX_CHARS: usize = 1000;
const EMAIL_MAX_CHARS: usize = 254;

pub const NAME_REQUIRED: &str = "Name is required";
pub const NAME_LENGTH: &str = "Name must be between 2 and 100 characters";
pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Invalid email";
pub const MESSAGE_REQUIRED: &str = "Message is required";
pub const MESSAGE_LENGTH: &str = "Message must be between 10 and 1000 characters";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
    )
    .expect("email pattern is valid")
});

/// Raw form payload; absent fields deserialize as `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl ContactRequest {
    pub fn new(name: &str, email: &str, message: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            message: Some(message.to_string()),
        }
    }
}

/// A submission that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    /// Normalized address
    pub email: String,
    pub message: String,
}

impl ContactMessage {
    /// Identity used to recognise a repeated submission
    pub fn dedup_key(&self) -> String {
        format!("{}\u{1f}{}", self.email, self.message)
    }
}

fn trimmed(field: &Option<String>) -> &str {
    field.as_deref().map(str::trim).unwrap_or("")
}

fn length_between(value: &str, min: usize, max: usize) -> bool {
    let n = value.chars().count();
    n >= min && n <= max
}

pub fn is_valid_email(address: &str) -> bool {
    if address.chars().count() > EMAIL_MAX_CHARS || !EMAIL_RE.is_match(address) {
        return false;
    }
    let Some((local, _)) = address.rsplit_once('@') else {
        return false;
    };
    local.len() <= 64 && !local.starts_with('.') && !local.ends_with('.') && !local.contains("..")
}

const GMAIL_DOMAINS: [&str; 2] = ["gmail.com", "googlemail.com"];
const PLUS_TAG_DOMAINS: [&str; 8] = [
    "hotmail.com",
    "live.com",
    "outlook.com",
    "msn.com",
    "icloud.com",
    "me.com",
    "mac.com",
    "hotmail.co.uk",
];
const DASH_TAG_DOMAINS: [&str; 3] = ["yahoo.com", "ymail.com", "rocketmail.com"];

/// Canonical form of an address
///
/// Lower-cases the whole address. For Gmail the local part loses its dots and
/// `+tag`, and `googlemail.com` becomes `gmail.com`. Outlook and iCloud drop
/// `+tag`; Yahoo drops `-tag`.
pub fn normalize_email(address: &str) -> String {
    let lower = address.trim().to_lowercase();
    let Some((local, domain)) = lower.rsplit_once('@') else {
        return lower;
    };

    if GMAIL_DOMAINS.contains(&domain) {
        let base = local.split('+').next().unwrap_or(local).replace('.', "");
        return format!("{}@gmail.com", base);
    }
    if PLUS_TAG_DOMAINS.contains(&domain) {
        let base = local.split('+').next().unwrap_or(local);
        return format!("{}@{}", base, domain);
    }
    if DASH_TAG_DOMAINS.contains(&domain) {
        let base = local.split('-').next().unwrap_or(local);
        return format!("{}@{}", base, domain);
    }
    lower
}

/// Validate a submission; `Err` holds one message per failing field
pub fn validate(request: &ContactRequest) -> Result<ContactMessage, Vec<String>> {
    let mut errors = Vec::new();

    let name = trimmed(&request.name);
    if name.is_empty() {
        errors.push(NAME_REQUIRED.to_string());
    } else if !length_between(name, NAME_MIN_CHARS, NAME_MAX_CHARS) {
        errors.push(NAME_LENGTH.to_string());
    }

    let email = trimmed(&request.email);
    if email.is_empty() {
        errors.push(EMAIL_REQUIRED.to_string());
    } else if !is_valid_email(email) {
        errors.push(EMAIL_INVALID.to_string());
    }

    let message = trimmed(&request.message);
    if message.is_empty() {
        errors.push(MESSAGE_REQUIRED.to_string());
    } else if !length_between(message, MESSAGE_MIN_CHARS, MESSAGE_MAX_CHARS) {
        errors.push(MESSAGE_LENGTH.to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ContactMessage {
        name: name.to_string(),
        email: normalize_email(email),
        message: message.to_string(),
    })
}
