use anyhow::{Context, Result};
use async_trait::async_trait;
use od_drawer_core::{ApiClient, DrawerConfig, HttpReply, Sleeper, Transport, TransportError};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

pub const API_URL_ENV: &str = "OFFERDESK_API_URL";
const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Native transport for the drawer API client.
///
/// The per-request timeout comes from the caller; reqwest's own timeout
/// error maps to `TransportError::TimedOut`.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("offerdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("offerdesk http client")?;
        Ok(Self { http })
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        debug!("POST {} -> {}", url, status);
        Ok(HttpReply { status, body })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::TimedOut
    } else {
        TransportError::Network(err.to_string())
    }
}

pub struct TokioSleeper;

#[async_trait(?Send)]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// API client over reqwest and tokio.
///
/// An empty `api_base_url` is filled from `OFFERDESK_API_URL`
/// (default: `http://localhost:5000`).
pub fn native_api_client(config: DrawerConfig) -> Result<(ApiClient, Rc<DrawerConfig>)> {
    let config = Rc::new(with_base_url(config, std::env::var(API_URL_ENV).ok()));
    info!("drawer api at {}", config.endpoint(""));
    let client = ApiClient::new(
        Rc::new(ReqwestTransport::new()?),
        Rc::new(TokioSleeper),
        config.clone(),
    );
    Ok((client, config))
}

fn with_base_url(mut config: DrawerConfig, from_env: Option<String>) -> DrawerConfig {
    if config.api_base_url.trim().is_empty() {
        config.api_base_url = from_env
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
    }
    config.api_base_url = config.api_base_url.trim_end_matches('/').to_owned();
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use od_api_types::{GenerateQrRequest, SendOtpRequest, VerifyOtpRequest};
    use od_drawer_core::ApiError;
    use serde_json::{Value, json};

    async fn send_otp(Json(body): Json<SendOtpRequest>) -> (StatusCode, Json<Value>) {
        if body.phone_number.len() < 10 {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "error", "message": "Invalid phone number"})),
            );
        }
        (StatusCode::OK, Json(json!({"status": "success"})))
    }

    async fn verify_otp(Json(body): Json<VerifyOtpRequest>) -> Json<Value> {
        if body.otp == "123456" {
            Json(json!({"status": "success", "message": "Phone verified"}))
        } else {
            Json(json!({"status": "error", "message": "Invalid OTP"}))
        }
    }

    async fn generate_qr(Json(body): Json<GenerateQrRequest>) -> Json<Value> {
        Json(json!({
            "status": "success",
            "qr_code": "data:image/png;base64,AAAA",
            "upi_details": {
                "upi_url": format!("upi://pay?pa=m@bank&am={}", body.amount),
                "merchant_name": "Offerdesk",
                "amount": body.amount
            },
            "transaction_id": "txn_1"
        }))
    }

    async fn slow() -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Json(json!({"status": "success"}))
    }

    async fn spawn_stub() -> anyhow::Result<String> {
        let app = Router::new()
            .route("/api/otp/send", post(send_otp))
            .route("/api/otp/verify", post(verify_otp))
            .route("/api/payment/generate-qr", post(generate_qr))
            .route("/slow", post(slow));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{addr}"))
    }

    fn client_for(base_url: String) -> ApiClient {
        let (client, config) = native_api_client(DrawerConfig {
            api_base_url: base_url.clone(),
            ..DrawerConfig::default()
        })
        .expect("client builds");
        assert_eq!(config.api_base_url, base_url);
        client
    }

    #[test]
    fn base_url_falls_back_to_env_then_default() {
        let config = with_base_url(DrawerConfig::default(), Some("https://api.test/".into()));
        assert_eq!(config.endpoint("/api/otp/send"), "https://api.test/api/otp/send");

        let config = with_base_url(DrawerConfig::default(), None);
        assert_eq!(config.api_base_url, "http://localhost:5000");

        let explicit = DrawerConfig {
            api_base_url: "https://explicit.test".into(),
            ..DrawerConfig::default()
        };
        let config = with_base_url(explicit, Some("https://api.test".into()));
        assert_eq!(config.api_base_url, "https://explicit.test");
    }

    #[tokio::test]
    async fn otp_round_trip_against_stub() -> anyhow::Result<()> {
        let api = client_for(spawn_stub().await?);

        let send = SendOtpRequest {
            phone_number: "9876543210".into(),
            country_code: "+91".into(),
        };
        assert!(api.send_otp(&send).await?.is_success());

        let short = SendOtpRequest {
            phone_number: "123".into(),
            country_code: "+91".into(),
        };
        let err = api.send_otp(&short).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 400,
                message: "Invalid phone number".into()
            }
        );

        let mut verify = VerifyOtpRequest {
            phone_number: "9876543210".into(),
            country_code: "+91".into(),
            otp: "000000".into(),
            browser_data: Default::default(),
            request_time: "2026-01-01T00:00:00.000Z".into(),
        };
        let err = api.verify_otp(&verify).await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid OTP");

        verify.otp = "123456".into();
        assert!(api.verify_otp(&verify).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn qr_against_stub() -> anyhow::Result<()> {
        let api = client_for(spawn_stub().await?);
        let response = api
            .generate_qr(&GenerateQrRequest {
                amount: 1000.0,
                phone_number: "+919876543210".into(),
                browser_data: Default::default(),
                transaction_note: "Payment for order".into(),
            })
            .await?;

        assert_eq!(response.transaction_id.as_deref(), Some("txn_1"));
        let upi = response.upi_details.unwrap_or_default();
        assert_eq!(upi.merchant_name.as_deref(), Some("Offerdesk"));
        assert!(upi.pay_url().is_some_and(|url| url.starts_with("upi://pay")));
        Ok(())
    }

    #[tokio::test]
    async fn slow_server_times_out() -> anyhow::Result<()> {
        let base = spawn_stub().await?;
        let transport = ReqwestTransport::new()?;

        let result = transport
            .post_json(
                &format!("{base}/slow"),
                &json!({}),
                Duration::from_millis(200),
            )
            .await;

        assert_eq!(result, Err(TransportError::TimedOut));
        Ok(())
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let result = ReqwestTransport::new()?
            .post_json(&format!("http://{addr}/api/otp/send"), &json!({}), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(TransportError::Network(_))));
        Ok(())
    }
}
