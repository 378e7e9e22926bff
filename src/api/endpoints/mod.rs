//! API endpoint handlers.
//!
//! One module per role surface. Handlers open a connection, call into the
//! domain modules and shape the JSON response.

pub mod admin;
pub mod doctor;
pub mod health;
pub mod labtech;
pub mod pharmacist;
pub mod receptionist;
pub mod token;

use crate::api::error::ApiError;

/// Parse an optional boolean query flag (`true`/`false`/`1`/`0`).
pub(crate) fn parse_flag(name: &str, value: Option<&str>) -> Result<Option<bool>, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some("true") | Some("1") | Some("True") => Ok(Some(true)),
        Some("false") | Some("0") | Some("False") => Ok(Some(false)),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Invalid value for {name}: \"{other}\""
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        assert_eq!(parse_flag("dispensed", None).unwrap(), None);
        assert_eq!(parse_flag("dispensed", Some("true")).unwrap(), Some(true));
        assert_eq!(parse_flag("dispensed", Some("0")).unwrap(), Some(false));
        assert!(parse_flag("dispensed", Some("maybe")).is_err());
    }
}
