//! PII redaction for log text.
//!
//! [`redact`] replaces three kinds of personal data with fixed markers:
//!
//! | Kind | Shape | Marker |
//! |------|-------|--------|
//! | Phone | `555-1234`, `123-456-7890` | `[REDACTED]` |
//! | Email | `local@domain.tld` | `[EMAIL_REDACTED]` |
//! | IPv4 | four dot-separated octets, each 0-255 | `[IP_REDACTED]` |
//!
//! All three patterns are compiled into one alternation and applied in a
//! single left-to-right pass, so matches never overlap and the result does
//! not depend on rule order. Markers contain no digits and no `@`, which keeps
//! `redact(redact(x)) == redact(x)`.
//!
//! ```
//! let out = redact::redact("User john@example.com called 555-1234 from 10.0.0.1");
//! assert_eq!(out, "User [EMAIL_REDACTED] called [REDACTED] from [IP_REDACTED]");
//! ```
use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Marker substituted for phone numbers.
pub const PHONE_MARKER: &str = "[REDACTED]";
/// Marker substituted for email addresses.
pub const EMAIL_MARKER: &str = "[EMAIL_REDACTED]";
/// Marker substituted for IPv4 addresses.
pub const IPV4_MARKER: &str = "[IP_REDACTED]";

const OCTET: &str = r"(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])";

// Email comes first so an address whose local part looks like an IP or a
// phone number is redacted as a whole.
static PII_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?P<email>\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{{2,}}\b)|(?P<ipv4>\b(?:{octet}\.){{3}}{octet}\b)|(?P<phone>\b(?:[0-9]{{3}}-)?[0-9]{{3}}-[0-9]{{4}}\b)",
        octet = OCTET
    );
    // The pattern is a compile-time constant; failure here is a programming error.
    Regex::new(&pattern).expect("PII pattern must compile")
});

/// A category of personal data recognized by the redactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiKind {
    Phone,
    Email,
    Ipv4,
}

impl PiiKind {
    /// The marker this kind is replaced with.
    pub fn marker(self) -> &'static str {
        match self {
            PiiKind::Phone => PHONE_MARKER,
            PiiKind::Email => EMAIL_MARKER,
            PiiKind::Ipv4 => IPV4_MARKER,
        }
    }

    fn of(caps: &Captures<'_>) -> Self {
        if caps.name("email").is_some() {
            PiiKind::Email
        } else if caps.name("ipv4").is_some() {
            PiiKind::Ipv4
        } else {
            PiiKind::Phone
        }
    }
}

/// How many matches of each kind were replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionSummary {
    pub phone: usize,
    pub email: usize,
    pub ipv4: usize,
}

impl RedactionSummary {
    pub fn total(&self) -> usize {
        self.phone + self.email + self.ipv4
    }

    fn bump(&mut self, kind: PiiKind) {
        match kind {
            PiiKind::Phone => self.phone += 1,
            PiiKind::Email => self.email += 1,
            PiiKind::Ipv4 => self.ipv4 += 1,
        }
    }
}

/// Redacted text together with per-kind counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub text: String,
    pub summary: RedactionSummary,
}

/// Replaces every recognized phone number, email address and IPv4 address.
///
/// Pure and deterministic; text without matches is returned unchanged.
pub fn redact(text: &str) -> String {
    redact_cow(text).into_owned()
}

/// Like [`redact`], borrowing the input when nothing matched.
pub fn redact_cow(text: &str) -> Cow<'_, str> {
    PII_PATTERN.replace_all(text, |caps: &Captures<'_>| PiiKind::of(caps).marker())
}

/// Redacts and reports how many of each kind were found.
pub fn redact_with_summary(text: &str) -> Redaction {
    let mut summary = RedactionSummary::default();
    let redacted = PII_PATTERN.replace_all(text, |caps: &Captures<'_>| {
        let kind = PiiKind::of(caps);
        summary.bump(kind);
        kind.marker()
    });
    Redaction {
        text: redacted.into_owned(),
        summary,
    }
}
