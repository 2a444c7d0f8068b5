use serde::{Deserialize, Serialize};

/// Body of `/api/otp/send` and `/api/otp/resend`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendOtpRequest {
    pub phone_number: String,
    pub country_code: String,
}

pub type ResendOtpRequest = SendOtpRequest;

/// Passive device fingerprint attached to verify and QR requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BrowserData {
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub screen_width: u32,
    #[serde(default)]
    pub screen_height: u32,
    #[serde(default)]
    pub color_depth: u32,
    #[serde(default)]
    pub pixel_ratio: f64,
    #[serde(default)]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub country_code: String,
    pub otp: String,
    pub browser_data: BrowserData,
    pub request_time: String,
}

/// Shape shared by the OTP endpoints. Older backends answer with
/// `success: bool`, newer ones with `status: "success" | "error"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some("error".to_owned()),
            success: None,
            message: Some(message.into()),
        }
    }

    /// Whether the body states an outcome at all.
    pub fn has_outcome(&self) -> bool {
        self.status.is_some() || self.success.is_some()
    }

    /// A body without an outcome counts as success; callers that must
    /// confirm one check `has_outcome` first.
    pub fn is_success(&self) -> bool {
        match (&self.status, self.success) {
            (Some(status), _) => status.eq_ignore_ascii_case("success"),
            (None, Some(success)) => success,
            (None, None) => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateQrRequest {
    pub amount: f64,
    pub phone_number: String,
    pub browser_data: BrowserData,
    pub transaction_note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpiDetails {
    #[serde(default)]
    pub upi_id: Option<String>,
    #[serde(default)]
    pub upi_url: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub transaction_note: Option<String>,
}

impl UpiDetails {
    /// Deep link for the payment; falls back to a bare `upi://pay?pa=` link
    /// when the backend only returned the payee id.
    pub fn pay_url(&self) -> Option<String> {
        if let Some(url) = self.upi_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_owned());
        }
        self.upi_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("upi://pay?pa={id}"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateQrResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub upi_details: Option<UpiDetails>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Catalog entry as published in `offerings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offering {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}
