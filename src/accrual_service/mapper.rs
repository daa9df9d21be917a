use crate::error::{Error, Result};
use crate::model::accrual::AccrualStatus;

/// Maps the accrual service vocabulary onto local order statuses.
/// Case-insensitive; anything unrecognised is an error, never a guess.
pub fn map_status(external: &str) -> Result<AccrualStatus> {
    match external.to_ascii_lowercase().as_str() {
        "registered" => Ok(AccrualStatus::New),
        "processing" => Ok(AccrualStatus::Processing),
        "invalid" => Ok(AccrualStatus::Invalid),
        "processed" => Ok(AccrualStatus::Processed),
        _ => Err(Error::UnknownAccrualStatus(external.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses_in_any_case() {
        assert_eq!(map_status("REGISTERED").unwrap(), AccrualStatus::New);
        assert_eq!(map_status("processing").unwrap(), AccrualStatus::Processing);
        assert_eq!(map_status("Invalid").unwrap(), AccrualStatus::Invalid);
        assert_eq!(map_status("PROCESSED").unwrap(), AccrualStatus::Processed);
    }

    #[test]
    fn rejects_unknown_statuses() {
        for status in ["", "NEW", "processed ", "DONE"] {
            let err = map_status(status).unwrap_err();
            assert!(matches!(err, Error::UnknownAccrualStatus(ref s) if s == status));
        }
    }
}
