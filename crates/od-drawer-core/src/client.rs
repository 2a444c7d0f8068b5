//! Backend API client.
//!
//! Wraps a `Transport` with the per-call timeout, uniform error translation,
//! and bounded retry on OTP verification. Transports only move bytes; every
//! status and body rule lives here so the browser and native transports
//! behave the same.

use async_trait::async_trait;
use od_api_types::{
    GenerateQrRequest, GenerateQrResponse, ResendOtpRequest, SendOtpRequest, StatusResponse,
    VerifyOtpRequest,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DrawerConfig;
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request aborted after timeout")]
    TimedOut,
    #[error("{0}")]
    Network(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::TimedOut => ApiError::TimedOut,
            TransportError::Network(message) => ApiError::Network(message),
        }
    }
}

/// JSON POST with credentials. Must abort and report `TimedOut` once
/// `timeout` elapses.
#[async_trait(?Send)]
pub trait Transport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError>;
}

#[async_trait(?Send)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Rc<dyn Transport>,
    sleeper: Rc<dyn Sleeper>,
    config: Rc<DrawerConfig>,
}

impl ApiClient {
    pub fn new(
        transport: Rc<dyn Transport>,
        sleeper: Rc<dyn Sleeper>,
        config: Rc<DrawerConfig>,
    ) -> Self {
        Self {
            transport,
            sleeper,
            config,
        }
    }

    pub async fn send_otp(&self, request: &SendOtpRequest) -> Result<StatusResponse, ApiError> {
        self.call_status(&self.config.send_otp_path, request).await
    }

    pub async fn resend_otp(
        &self,
        request: &ResendOtpRequest,
    ) -> Result<StatusResponse, ApiError> {
        self.call_status(&self.config.resend_otp_path, request).await
    }

    /// Retries transient failures up to `verify_retry.max_retries` times with
    /// a fixed backoff, then gives up with `RetriesExhausted`. A reply must
    /// state its outcome; a bare 200 is not a verification.
    pub async fn verify_otp(
        &self,
        request: &VerifyOtpRequest,
    ) -> Result<StatusResponse, ApiError> {
        let policy = &self.config.verify_retry;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.call_status(&self.config.verify_otp_path, request).await {
                Ok(response) if !response.has_outcome() => {
                    warn!("otp verify reply has no status");
                    return Err(ApiError::Parse(
                        "verify response has no status".to_owned(),
                    ));
                }
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() => {
                    if attempts > policy.max_retries {
                        warn!("otp verify failed after {} attempts: {}", attempts, err);
                        return Err(ApiError::RetriesExhausted {
                            attempts,
                            last: Box::new(err),
                        });
                    }
                    debug!("otp verify attempt {} failed ({}), retrying", attempts, err);
                    self.sleeper.sleep(policy.backoff()).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn generate_qr(
        &self,
        request: &GenerateQrRequest,
    ) -> Result<GenerateQrResponse, ApiError> {
        let reply = self.post(&self.config.generate_qr_path, request).await?;
        let response: GenerateQrResponse = decode(&reply)?;

        if response
            .status
            .as_deref()
            .is_some_and(|s| !s.eq_ignore_ascii_case("success"))
        {
            return Err(ApiError::Server {
                status: reply.status,
                message: response
                    .message
                    .unwrap_or_else(|| "Failed to generate QR code".to_owned()),
            });
        }

        if response.qr_code.as_deref().is_none_or(str::is_empty) {
            return Err(ApiError::Parse("response has no qr_code".to_owned()));
        }

        Ok(response)
    }

    async fn call_status<T: Serialize>(
        &self,
        path: &str,
        request: &T,
    ) -> Result<StatusResponse, ApiError> {
        let reply = self.post(path, request).await?;
        let response: StatusResponse = decode(&reply)?;
        if !response.is_success() {
            return Err(ApiError::Server {
                status: reply.status,
                message: response
                    .message
                    .unwrap_or_else(|| "Request failed".to_owned()),
            });
        }
        Ok(response)
    }

    async fn post<T: Serialize>(&self, path: &str, request: &T) -> Result<HttpReply, ApiError> {
        let url = self.config.endpoint(path);
        let body = serde_json::to_value(request).map_err(|e| ApiError::Parse(e.to_string()))?;

        let reply = self
            .transport
            .post_json(&url, &body, self.config.request_timeout())
            .await?;

        if !reply.is_success() {
            return Err(status_error(&reply));
        }
        Ok(reply)
    }
}

fn decode<R: DeserializeOwned>(reply: &HttpReply) -> Result<R, ApiError> {
    serde_json::from_str(&reply.body).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Non-2xx: prefer the backend's `message`, fall back to the status line.
fn status_error(reply: &HttpReply) -> ApiError {
    let message = serde_json::from_str::<StatusResponse>(&reply.body)
        .ok()
        .and_then(|r| r.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", reply.status));
    ApiError::Server {
        status: reply.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSleeper, ScriptedTransport};
    use od_api_types::BrowserData;
    use serde_json::json;

    fn client(transport: &Rc<ScriptedTransport>, sleeper: &Rc<RecordingSleeper>) -> ApiClient {
        ApiClient::new(
            transport.clone(),
            sleeper.clone(),
            Rc::new(DrawerConfig::default()),
        )
    }

    fn verify_request() -> VerifyOtpRequest {
        VerifyOtpRequest {
            phone_number: "9876543210".to_owned(),
            country_code: "+91".to_owned(),
            otp: "123456".to_owned(),
            browser_data: BrowserData::default(),
            request_time: "2026-01-01T00:00:00.000Z".to_owned(),
        }
    }

    #[tokio::test]
    async fn send_posts_to_configured_path() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        transport.reply_json("/api/otp/send", 200, json!({"status": "success"}));

        let request = SendOtpRequest {
            phone_number: "9876543210".to_owned(),
            country_code: "+91".to_owned(),
        };
        let response = client(&transport, &sleeper).send_otp(&request).await;

        assert!(response.is_ok());
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "/api/otp/send");
        assert_eq!(calls[0].body, json!({"phone_number": "9876543210", "country_code": "+91"}));
        assert_eq!(calls[0].timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn error_status_is_translated() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        transport.reply_json(
            "/api/otp/send",
            400,
            json!({"status": "error", "message": "Invalid phone number"}),
        );
        transport.reply("/api/otp/resend", 502, "<html>bad gateway</html>");
        transport.reply_json("/api/otp/resend", 200, json!({"success": false}));

        let request = SendOtpRequest {
            phone_number: "1".to_owned(),
            country_code: "+91".to_owned(),
        };
        let api = client(&transport, &sleeper);

        let err = api.send_otp(&request).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 400,
                message: "Invalid phone number".to_owned()
            }
        );
        let err = api.resend_otp(&request).await.unwrap_err();
        assert_eq!(err.user_message(), "HTTP 502");
        let err = api.resend_otp(&request).await.unwrap_err();
        assert_eq!(err.to_envelope(), StatusResponse::error("Request failed"));
    }

    #[tokio::test]
    async fn timeout_is_distinct_from_network_failure() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        transport.fail("/api/otp/send", TransportError::TimedOut);
        transport.fail("/api/otp/send", TransportError::Network("offline".to_owned()));

        let request = SendOtpRequest {
            phone_number: "9876543210".to_owned(),
            country_code: "+91".to_owned(),
        };
        let api = client(&transport, &sleeper);
        assert_eq!(api.send_otp(&request).await, Err(ApiError::TimedOut));
        assert_eq!(
            api.send_otp(&request).await,
            Err(ApiError::Network("offline".to_owned()))
        );
        // Only verification retries.
        assert_eq!(transport.calls().len(), 2);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn verify_gives_up_after_three_transient_failures() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        for _ in 0..4 {
            transport.fail("/api/otp/verify", TransportError::TimedOut);
        }

        let err = client(&transport, &sleeper)
            .verify_otp(&verify_request())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::RetriesExhausted {
                attempts: 3,
                last: Box::new(ApiError::TimedOut)
            }
        );
        assert_eq!(transport.calls().len(), 3);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(1); 2]);
    }

    #[tokio::test]
    async fn verify_recovers_after_transient_failure() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        transport.reply_json(
            "/api/otp/verify",
            503,
            json!({"status": "error", "message": "Network error contacting SMS provider"}),
        );
        transport.reply_json("/api/otp/verify", 200, json!({"status": "success"}));

        let response = client(&transport, &sleeper)
            .verify_otp(&verify_request())
            .await;

        assert!(response.is_ok());
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(sleeper.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn verify_requires_a_stated_outcome() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        transport.reply_json("/api/otp/verify", 200, json!({"message": "rate limited"}));
        transport.reply_json("/api/otp/verify", 200, json!({"success": true}));
        let api = client(&transport, &sleeper);

        let err = api.verify_otp(&verify_request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
        assert_eq!(transport.calls().len(), 1);

        assert!(api.verify_otp(&verify_request()).await.is_ok());
    }

    #[tokio::test]
    async fn send_accepts_a_bare_reply() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        transport.reply_json("/api/otp/send", 200, json!({"message": "sent"}));

        let request = SendOtpRequest {
            phone_number: "9876543210".to_owned(),
            country_code: "+91".to_owned(),
        };
        assert!(client(&transport, &sleeper).send_otp(&request).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_code_is_not_retried() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        transport.reply_json(
            "/api/otp/verify",
            400,
            json!({"status": "error", "message": "Invalid OTP"}),
        );

        let err = client(&transport, &sleeper)
            .verify_otp(&verify_request())
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Invalid OTP");
        assert_eq!(transport.calls().len(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn qr_without_image_is_a_parse_error() {
        let transport = Rc::new(ScriptedTransport::default());
        let sleeper = Rc::new(RecordingSleeper::default());
        transport.reply_json("/api/payment/generate-qr", 200, json!({"status": "success"}));
        transport.reply_json(
            "/api/payment/generate-qr",
            200,
            json!({
                "status": "success",
                "qr_code": "data:image/png;base64,AAAA",
                "upi_details": {"upi_url": "upi://pay?pa=m@bank&am=1000", "merchant_name": "M"}
            }),
        );

        let request = GenerateQrRequest {
            amount: 1000.0,
            phone_number: "+919876543210".to_owned(),
            browser_data: BrowserData::default(),
            transaction_note: "Payment for order".to_owned(),
        };
        let api = client(&transport, &sleeper);

        assert!(matches!(
            api.generate_qr(&request).await,
            Err(ApiError::Parse(_))
        ));
        let response = api.generate_qr(&request).await.expect("qr should be generated");
        assert_eq!(
            response.upi_details.and_then(|u| u.pay_url()).as_deref(),
            Some("upi://pay?pa=m@bank&am=1000")
        );
        assert_eq!(transport.calls()[1].body["amount"], json!(1000.0));
    }
}
