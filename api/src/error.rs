use thiserror::Error;

/// Errors produced by the REST surface.
///
/// Not-found and conflict responses are their own variants because callers
/// surface them as specific conditions (invalid credentials, account exists,
/// walk gone); every other non-success status collapses into
/// [`ApiError::Status`] and is shown as a generic server failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,
    #[error("conflict with existing resource")]
    Conflict,
    #[error("server returned status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a non-success HTTP status to its variant. Success statuses map to
    /// `None`.
    pub fn from_status(status: u16) -> Option<ApiError> {
        match status {
            200..=299 => None,
            404 => Some(ApiError::NotFound),
            409 => Some(ApiError::Conflict),
            other => Some(ApiError::Status(other)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses_map_to_none() {
        assert!(ApiError::from_status(200).is_none());
        assert!(ApiError::from_status(201).is_none());
        assert!(ApiError::from_status(204).is_none());
    }

    #[test]
    fn test_specific_statuses_get_their_own_variant() {
        assert!(ApiError::from_status(404).unwrap().is_not_found());
        assert!(ApiError::from_status(409).unwrap().is_conflict());
    }

    #[test]
    fn test_other_statuses_are_generic() {
        match ApiError::from_status(500) {
            Some(ApiError::Status(500)) => {}
            other => panic!("unexpected mapping: {other:?}"),
        }
        match ApiError::from_status(401) {
            Some(ApiError::Status(401)) => {}
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
