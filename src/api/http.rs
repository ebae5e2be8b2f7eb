use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use super::{RecognitionApi, RecognizeResponse};
use crate::capture::CaptureFrame;
use crate::config::{ApiSettings, RecognitionConfig};
use crate::error::FacegateError;

#[derive(Debug, Deserialize)]
struct UserIdResponse {
    user_id: String,
}

/// HTTP client for the recognition backend.
pub struct HttpRecognitionApi {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl HttpRecognitionApi {
    pub fn new(settings: &ApiSettings, config: &RecognitionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
            health_timeout: config.health_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport(err: reqwest::Error) -> FacegateError {
    FacegateError::Transport(err.to_string())
}

#[async_trait]
impl RecognitionApi for HttpRecognitionApi {
    async fn recognize(&self, frame: &CaptureFrame) -> Result<RecognizeResponse, FacegateError> {
        let part = Part::bytes(frame.bytes.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(transport)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/face/recognize/check"))
            .multipart(form)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        response.json::<RecognizeResponse>().await.map_err(transport)
    }

    async fn user_id_by_name(&self, name: &str) -> Result<String, FacegateError> {
        let resolve = |reason: String| FacegateError::ProfileResolution {
            name: name.to_string(),
            reason,
        };

        let response = self
            .client
            .get(self.url("/user/id-by-name"))
            .query(&[("name", name)])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|err| resolve(err.to_string()))?
            .error_for_status()
            .map_err(|err| resolve(err.to_string()))?;

        response
            .json::<UserIdResponse>()
            .await
            .map(|body| body.user_id)
            .map_err(|err| resolve(err.to_string()))
    }

    async fn start_session(&self, user_id: &str, user_name: &str) -> Result<(), FacegateError> {
        self.client
            .post(self.url("/session/start"))
            .json(&json!({ "user_id": user_id, "username": user_name }))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }

    async fn end_session(&self, session_id: &str) -> Result<(), FacegateError> {
        self.client
            .post(self.url(&format!("/session/end/{session_id}")))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }

    async fn health(&self) -> Result<(), FacegateError> {
        self.client
            .get(self.url("/health"))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|err| FacegateError::ServerUnavailable(err.to_string()))?
            .error_for_status()
            .map_err(|err| FacegateError::ServerUnavailable(err.to_string()))?;
        Ok(())
    }
}
