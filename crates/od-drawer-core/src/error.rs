use od_api_types::StatusResponse;
use thiserror::Error;

/// Failure of a backend call after transport and status translation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request timed out")]
    TimedOut,
    #[error("network error: {0}")]
    Network(String),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Parse(String),
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<ApiError> },
}

const TRANSIENT_PATTERNS: [&str; 5] = [
    "timeout",
    "timed out",
    "network",
    "failed to fetch",
    "connection",
];

impl ApiError {
    /// Timeouts and network failures, including server messages that report
    /// one. Only these are retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::TimedOut | ApiError::Network(_) => true,
            ApiError::Server { message, .. } => {
                let lowered = message.to_lowercase();
                TRANSIENT_PATTERNS.iter().any(|p| lowered.contains(p))
            }
            ApiError::Parse(_) | ApiError::RetriesExhausted { .. } => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ApiError::TimedOut => "The request timed out. Please try again.".to_owned(),
            ApiError::Network(_) => {
                "Network error. Check your connection and try again.".to_owned()
            }
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Parse(_) => "Something went wrong. Please try again.".to_owned(),
            ApiError::RetriesExhausted { .. } => {
                "We could not reach the verification service. Please try again in a moment."
                    .to_owned()
            }
        }
    }

    /// Uniform `{status: "error", message}` shape.
    pub fn to_envelope(&self) -> StatusResponse {
        StatusResponse::error(self.user_message())
    }
}

/// Local validation and step-guard failures. None of these issue a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Please enter your phone number.")]
    PhoneMissing,
    #[error("Please enter a valid phone number (at least {min} digits).")]
    PhoneTooShort { min: usize },
    #[error("Please enter the complete 6-digit code.")]
    OtpIncomplete,
    #[error("You can request a new code in {seconds}s.")]
    ResendNotReady { seconds: u32 },
    #[error("a request is already in progress")]
    Busy,
    #[error("action not available in the current step")]
    WrongStep,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ApiError::TimedOut.is_transient());
        assert!(ApiError::Network("offline".into()).is_transient());
        assert!(
            ApiError::Server {
                status: 503,
                message: "Upstream Timeout".into()
            }
            .is_transient()
        );
        assert!(
            !ApiError::Server {
                status: 400,
                message: "Invalid OTP".into()
            }
            .is_transient()
        );
        assert!(!ApiError::Parse("eof".into()).is_transient());
    }

    #[test]
    fn envelope_carries_server_message() {
        let err = ApiError::Server {
            status: 429,
            message: "Too many attempts".into(),
        };
        let envelope = err.to_envelope();
        assert_eq!(envelope.status.as_deref(), Some("error"));
        assert_eq!(envelope.message.as_deref(), Some("Too many attempts"));
    }
}
