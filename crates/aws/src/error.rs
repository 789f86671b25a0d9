use imagecast_backend::BackendError;

/// Service error codes that mean the addressed resource does not exist.
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchKey",
    "NotFound",
    "NoSuchBucket",
    "ResourceNotFoundException",
];

/// Service error codes raised when a conditional write finds the target taken.
const CONFLICT_CODES: &[&str] = &["PreconditionFailed", "ConditionalRequestConflict"];

/// Service error codes that mean the request was throttled.
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "SlowDown",
    "RequestThrottled",
    "TooManyRequestsException",
];

/// Classify an AWS SDK error string into the appropriate [`BackendError`].
///
/// This helper inspects the error message for common patterns (throttling,
/// timeout, connection) and falls back to [`BackendError::Service`].
pub fn classify_sdk_error(error_str: &str) -> BackendError {
    let lower = error_str.to_lowercase();
    if lower.contains("throttl") || lower.contains("rate exceed") || lower.contains("too many") {
        BackendError::Throttled
    } else if lower.contains("timeout") || lower.contains("timed out") {
        BackendError::Timeout
    } else if lower.contains("connection")
        || lower.contains("connect")
        || lower.contains("dns")
        || lower.contains("network")
    {
        BackendError::Connection(error_str.to_owned())
    } else {
        BackendError::Service(error_str.to_owned())
    }
}

/// Classify an SDK error using its service error code when one is present,
/// falling back to [`classify_sdk_error`] on the rendered message.
pub fn classify_service_error(code: Option<&str>, error_str: &str) -> BackendError {
    match code {
        Some(code) if NOT_FOUND_CODES.contains(&code) => {
            BackendError::NotFound(error_str.to_owned())
        }
        Some(code) if THROTTLING_CODES.contains(&code) => BackendError::Throttled,
        Some(code) if CONFLICT_CODES.contains(&code) => BackendError::Conflict(error_str.to_owned()),
        _ => classify_sdk_error(error_str),
    }
}
