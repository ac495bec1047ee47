//! Skin-lesion screening client.
//!
//! The classification service takes one image per request on `POST /predict`
//! (multipart field `file`) and answers with the predicted class, its
//! probability, the model that produced it and a base64 JPEG Grad-CAM
//! overlay. `GET /health` reports liveness.
//!
//! A melanoma gate model runs first; non-melanoma images are then classified
//! into the detailed lesion classes by a second model. The client does not
//! care which path ran beyond reporting `model_used`.

use base64::Engine as _;
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{LesionClass, ScreeningModel, ScreeningResult};

/// Upload cap, checked before any bytes leave the device.
pub const MAX_IMAGE_BYTES: usize = 15 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("Screening service is not reachable at {0}")]
    Connection(String),

    #[error("Screening request timed out after {0}s")]
    Timeout(u64),

    #[error("Screening service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Lesion classification backend.
pub trait LesionClassifier: Send + Sync {
    /// Classify one image. `content_type` must be an `image/*` MIME type.
    fn classify(&self, image: &[u8], content_type: &str) -> Result<ScreeningResult, ScreeningError>;

    /// Whether the service reports itself healthy.
    fn health(&self) -> Result<bool, ScreeningError>;
}

/// Body of a successful `/predict` response.
#[derive(Debug, Deserialize)]
pub struct PredictionResponse {
    pub class_name: String,
    pub confidence: f64,
    pub model_used: String,
    pub visualization: String,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

/// Reject uploads the service would refuse anyway.
pub fn validate_upload(image: &[u8], content_type: &str) -> Result<(), ScreeningError> {
    if image.is_empty() {
        return Err(ScreeningError::InvalidInput("image is empty".into()));
    }
    if image.len() > MAX_IMAGE_BYTES {
        return Err(ScreeningError::InvalidInput(format!(
            "image is {} bytes (max {MAX_IMAGE_BYTES})",
            image.len()
        )));
    }
    if !content_type.starts_with("image/") {
        return Err(ScreeningError::InvalidInput(format!(
            "file must be an image, got '{content_type}'"
        )));
    }
    Ok(())
}

/// Convert the wire response into a typed result.
pub fn decode_prediction(response: PredictionResponse) -> Result<ScreeningResult, ScreeningError> {
    let lesion_class = LesionClass::from_str(&response.class_name)
        .map_err(|e| ScreeningError::ResponseParsing(e.to_string()))?;
    let model_used = ScreeningModel::from_str(&response.model_used)
        .map_err(|e| ScreeningError::ResponseParsing(e.to_string()))?;

    if !(0.0..=1.0).contains(&response.confidence) {
        return Err(ScreeningError::ResponseParsing(format!(
            "confidence {} outside [0, 1]",
            response.confidence
        )));
    }

    let visualization_jpeg = base64::engine::general_purpose::STANDARD
        .decode(response.visualization.trim())
        .map_err(|e| ScreeningError::ResponseParsing(format!("visualization: {e}")))?;

    Ok(ScreeningResult {
        lesion_class,
        confidence: response.confidence,
        model_used,
        visualization_jpeg,
    })
}

/// Blocking HTTP client for the hosted classification service.
pub struct HttpLesionClassifier {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpLesionClassifier {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ScreeningError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ScreeningError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn map_send_error(&self, e: reqwest::Error) -> ScreeningError {
        if e.is_connect() {
            ScreeningError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ScreeningError::Timeout(self.timeout_secs)
        } else {
            ScreeningError::HttpClient(e.to_string())
        }
    }
}

impl LesionClassifier for HttpLesionClassifier {
    fn classify(&self, image: &[u8], content_type: &str) -> Result<ScreeningResult, ScreeningError> {
        validate_upload(image, content_type)?;

        let part = reqwest::blocking::multipart::Part::bytes(image.to_vec())
            .file_name("lesion")
            .mime_str(content_type)
            .map_err(|e| ScreeningError::InvalidInput(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new().part("file", part);

        tracing::debug!(bytes = image.len(), content_type, "Submitting lesion image");
        let response = self
            .client
            .post(self.endpoint("predict"))
            .multipart(form)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Screening service rejected image");
            return Err(ScreeningError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PredictionResponse = response
            .json()
            .map_err(|e| ScreeningError::ResponseParsing(e.to_string()))?;
        let result = decode_prediction(parsed)?;

        tracing::info!(
            lesion_class = result.lesion_class.as_str(),
            confidence = result.confidence,
            model = result.model_used.as_str(),
            "Lesion screened"
        );
        Ok(result)
    }

    fn health(&self) -> Result<bool, ScreeningError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Ok(false);
        }
        let parsed: HealthResponse = response
            .json()
            .map_err(|e| ScreeningError::ResponseParsing(e.to_string()))?;
        Ok(parsed.status == "healthy")
    }
}

/// Fixed-answer classifier for tests and offline demos.
pub struct MockLesionClassifier {
    result: ScreeningResult,
    healthy: bool,
}

impl MockLesionClassifier {
    pub fn new(result: ScreeningResult) -> Self {
        Self {
            result,
            healthy: true,
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }
}

impl LesionClassifier for MockLesionClassifier {
    fn classify(&self, image: &[u8], content_type: &str) -> Result<ScreeningResult, ScreeningError> {
        validate_upload(image, content_type)?;
        Ok(self.result.clone())
    }

    fn health(&self) -> Result<bool, ScreeningError> {
        Ok(self.healthy)
    }
}
