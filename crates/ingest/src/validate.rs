//! Field constraints enforced before a message is accepted.
//!
//! Rules run in a fixed order and the first violation short-circuits:
//!
//! 1. `tenant_id` present and a string
//! 2. `tenant_id` non-empty, `[A-Za-z0-9_-]` only, within length
//! 3. `text` present and a string
//! 4. `text` non-empty, within length
//! 5. `log_id`, when present: a string, non-empty, within length
use crate::config::IngestConfig;
use crate::error::{Field, ValidationError, ValidationReason};
use crate::types::{CandidateFields, FieldValue, ValidatedFields};

/// Checks extracted fields against the configured constraints.
///
/// Nothing is generated or stamped here; a missing `log_id` stays `None`
/// until [`finalize`](crate::finalize).
///
/// ```rust
/// use ingest::{validate, CandidateFields, Field, FieldValue, IngestConfig, Source};
///
/// let candidate = CandidateFields {
///     tenant_id: FieldValue::Str("acme corp".into()),
///     log_id: FieldValue::Absent,
///     text: FieldValue::Str("hello".into()),
///     source: Source::Json,
/// };
/// let err = validate(candidate, &IngestConfig::default()).unwrap_err();
/// assert_eq!(err.field, Field::TenantId);
/// ```
pub fn validate(
    candidate: CandidateFields,
    cfg: &IngestConfig,
) -> Result<ValidatedFields, ValidationError> {
    let CandidateFields {
        tenant_id,
        log_id,
        text,
        source,
    } = candidate;

    let tenant_id = require_string(Field::TenantId, tenant_id)?;
    check_non_empty(Field::TenantId, &tenant_id)?;
    if !is_tenant_safe(&tenant_id) {
        return Err(ValidationError::new(
            Field::TenantId,
            ValidationReason::InvalidCharacters,
        ));
    }
    check_length(Field::TenantId, &tenant_id, cfg.max_tenant_id_chars)?;

    let text = require_string(Field::Text, text)?;
    check_non_empty(Field::Text, &text)?;
    check_length(Field::Text, &text, cfg.max_text_chars)?;

    let log_id = match log_id {
        FieldValue::Absent => None,
        other => {
            let id = require_string(Field::LogId, other)?;
            check_non_empty(Field::LogId, &id)?;
            check_length(Field::LogId, &id, cfg.max_log_id_chars)?;
            Some(id)
        }
    };

    Ok(ValidatedFields {
        tenant_id,
        log_id,
        text,
        source,
    })
}

/// True when every character is in `[A-Za-z0-9_-]`.
pub fn is_tenant_safe(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn require_string(field: Field, value: FieldValue) -> Result<String, ValidationError> {
    match value {
        FieldValue::Str(s) => Ok(s),
        FieldValue::Absent => Err(ValidationError::new(field, ValidationReason::Missing)),
        FieldValue::NonString(kind) => Err(ValidationError::new(
            field,
            ValidationReason::NotAString(kind),
        )),
    }
}

fn check_non_empty(field: Field, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, ValidationReason::Empty));
    }
    Ok(())
}

fn check_length(field: Field, value: &str, max: usize) -> Result<(), ValidationError> {
    // Cheap byte bound first: a string never has more chars than bytes.
    if value.len() <= max {
        return Ok(());
    }
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::new(
            field,
            ValidationReason::TooLong { max, actual },
        ));
    }
    Ok(())
}
