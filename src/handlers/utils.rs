// handlers/utils.rs - path id parsing and environment guards
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;

/// Parse a path id, answering 400 for anything that is not a UUID.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {} id: {}", what, raw)))
}

/// Bulk deletes exist for test setup only.
pub fn ensure_not_production(config: &AppConfig) -> Result<(), ApiError> {
    if config.is_production() {
        return Err(ApiError::forbidden("This operation is disabled in production"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "item").unwrap(), id);
        let err = parse_id("not-a-uuid", "item").unwrap_err();
        assert_eq!(err.message(), "Invalid item id: not-a-uuid");
    }

    #[test]
    fn test_bulk_delete_gate() {
        assert!(ensure_not_production(&AppConfig::testing()).is_ok());
        assert!(matches!(ensure_not_production(&AppConfig::production()), Err(ApiError::Forbidden(_))));
    }
}
