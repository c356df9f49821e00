//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API.

use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trim a user-supplied name and reject it when empty.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text, mapping blank input to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Ensure an amount is labeled with the group currency.
pub(crate) fn ensure_group_currency(group: Currency, actual: Currency) -> ResultEngine<()> {
    if group != actual {
        return Err(EngineError::CurrencyMismatch(format!(
            "group currency is {}, got {}",
            group.code(),
            actual.code()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(normalize_required_name("   ", "group").is_err());
        assert_eq!(normalize_required_name("  Trip ", "group").unwrap(), "Trip");
    }

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(
            normalize_optional_text(Some(" dinner ")),
            Some("dinner".to_string())
        );
    }

    #[test]
    fn currency_must_match_group() {
        assert!(ensure_group_currency(Currency::Inr, Currency::Inr).is_ok());
        assert!(matches!(
            ensure_group_currency(Currency::Inr, Currency::Usd),
            Err(EngineError::CurrencyMismatch(_))
        ));
    }
}
