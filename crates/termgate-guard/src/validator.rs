//! The input validation pipeline.
//!
//! Every line a peer sends is validated as exactly one [`FieldKind`]. The
//! pipeline always runs in the same order and stops at the first failure:
//!
//! ```text
//! 1. length       raw char count  > field max      → TooLong
//! 2. strip        drop NUL and every other control character
//! 3. blacklist    script / query / path signatures  → Blacklisted
//! 4. charset      structured fields: whitelist      → Charset, ...
//!                 free text: HTML-escaped, never rejected here
//! ```
//!
//! The validator holds nothing but its [`FieldLimits`], so a single instance
//! is shared by every session.

use std::fmt;

use crate::{blacklist, ValidationError};

/// System names nobody may register, compared case-insensitively.
pub const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "root",
    "system",
    "sysop",
    "guest",
    "anonymous",
    "user",
];

/// Characters that count as a "symbol" for password strength.
const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

// ---------------------------------------------------------------------------
// FieldKind
// ---------------------------------------------------------------------------

/// What an input line is supposed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A login or registration name.
    Username,
    /// A password, at login or registration. Never trimmed, never logged.
    Password,
    /// A menu command or a menu-level number (e.g. a message id).
    Command,
    /// Free text: message body lines and door-game input.
    Text,
    /// A message subject line.
    Subject,
    /// A profile field such as real name or location.
    Profile,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Username => "username",
            Self::Password => "password",
            Self::Command => "command",
            Self::Text => "text",
            Self::Subject => "subject",
            Self::Profile => "profile field",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// FieldLimits
// ---------------------------------------------------------------------------

/// Length bounds per field, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLimits {
    pub username_min: usize,
    pub username_max: usize,
    /// Minimum length for a new password (checked by the strength rule).
    pub password_min: usize,
    pub password_max: usize,
    pub command_max: usize,
    pub text_max: usize,
    pub subject_max: usize,
    pub profile_max: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            username_min: 3,
            username_max: 20,
            password_min: 8,
            password_max: 128,
            command_max: 16,
            text_max: 2000,
            subject_max: 80,
            profile_max: 50,
        }
    }
}

impl FieldLimits {
    /// The maximum raw length accepted for `kind`.
    pub fn max_for(&self, kind: FieldKind) -> usize {
        match kind {
            FieldKind::Username => self.username_max,
            FieldKind::Password => self.password_max,
            FieldKind::Command => self.command_max,
            FieldKind::Text => self.text_max,
            FieldKind::Subject => self.subject_max,
            FieldKind::Profile => self.profile_max,
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Stateless validator. Cheap to clone, safe to share.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    limits: FieldLimits,
}

impl Validator {
    pub fn new(limits: FieldLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &FieldLimits {
        &self.limits
    }

    /// Runs the full pipeline for `kind` and returns the sanitized value.
    ///
    /// - `Username` comes back trimmed, case preserved.
    /// - `Command` comes back trimmed and upper-cased; an empty line is a
    ///   valid (empty) command.
    /// - `Password` comes back with control characters removed and nothing
    ///   else touched.
    /// - Free-text kinds come back HTML-escaped.
    pub fn validate(
        &self,
        kind: FieldKind,
        raw: &str,
    ) -> Result<String, ValidationError> {
        // 1. Length, on the raw input so padding can't smuggle bytes past it.
        let max = self.limits.max_for(kind);
        if raw.chars().count() > max {
            return Err(ValidationError::TooLong { field: kind, max });
        }

        // 2. Control characters.
        let stripped: String = raw.chars().filter(|c| !c.is_control()).collect();

        // 3. Blacklist.
        if let Some(rule) = blacklist::scan(&stripped) {
            tracing::warn!(field = %kind, %rule, "input rejected by blacklist");
            return Err(ValidationError::Blacklisted { field: kind, rule });
        }

        // 4. Charset / escaping.
        match kind {
            FieldKind::Username => self.check_username(stripped.trim()),
            FieldKind::Command => check_command(stripped.trim()),
            FieldKind::Password => Ok(stripped),
            FieldKind::Text => Ok(escape_html(stripped.trim_end())),
            FieldKind::Subject | FieldKind::Profile => {
                Ok(escape_html(stripped.trim()))
            }
        }
    }

    /// Checks a new password against the strength rules: minimum length,
    /// and at least one upper-case letter, lower-case letter, digit and
    /// symbol.
    pub fn check_password_strength(
        &self,
        password: &str,
    ) -> Result<(), ValidationError> {
        let long_enough = password.chars().count() >= self.limits.password_min;
        let upper = password.chars().any(|c| c.is_ascii_uppercase());
        let lower = password.chars().any(|c| c.is_ascii_lowercase());
        let digit = password.chars().any(|c| c.is_ascii_digit());
        let symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

        if long_enough && upper && lower && digit && symbol {
            Ok(())
        } else {
            Err(ValidationError::WeakPassword {
                min: self.limits.password_min,
            })
        }
    }

    fn check_username(&self, name: &str) -> Result<String, ValidationError> {
        if name.chars().count() < self.limits.username_min {
            return Err(ValidationError::TooShort {
                field: FieldKind::Username,
                min: self.limits.username_min,
            });
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ValidationError::Charset {
                field: FieldKind::Username,
                allowed: "letters, digits and underscores",
            });
        }
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(ValidationError::MustStartWithLetter);
        }
        if RESERVED_USERNAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
        {
            return Err(ValidationError::ReservedName);
        }
        Ok(name.to_string())
    }
}

fn check_command(command: &str) -> Result<String, ValidationError> {
    let upper = command.to_ascii_uppercase();
    if !upper
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '?')
    {
        return Err(ValidationError::Charset {
            field: FieldKind::Command,
            allowed: "letters, digits and ?",
        });
    }
    Ok(upper)
}

/// Entities written by escaping. A literal `&` is always escaped, so any of
/// these in validated text came from a single typed character.
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#x27;"];

/// Length in characters of validated text as the peer typed it, with each
/// escape entity counted once.
pub fn display_len(escaped: &str) -> usize {
    let mut count = 0;
    let mut rest = escaped;
    while let Some(c) = rest.chars().next() {
        let step = if c == '&' {
            ENTITIES
                .iter()
                .find(|entity| rest.starts_with(**entity))
                .map_or(1, |entity| entity.len())
        } else {
            c.len_utf8()
        };
        rest = &rest[step..];
        count += 1;
    }
    count
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

// ===========================================================================
// Tests
// ===========================================================================
