//! Image edit relay client
//!
//! Forwards one edit request to `{baseUrl}/v1/images/edits` as multipart and
//! returns the upstream JSON untouched. Only errors are reshaped.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{header::AUTHORIZATION, Client};
use serde_json::Value;
use tracing::{error, info};

use super::error::ImageRelayError;
use crate::models::{ImageEditRequest, UploadedFile};
use crate::service::api_config::ApiConfigStore;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the upstream image-edit API
#[derive(Clone)]
pub struct ImageRelayClient {
    client: Client,
    config: Arc<ApiConfigStore>,
}

impl ImageRelayClient {
    /// Create a client that reads credentials from `config` on every call
    pub fn new(config: Arc<ApiConfigStore>, timeout: Duration) -> Result<Self, ImageRelayError> {
        let client = Client::builder()
            .connect_timeout(MAX_CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| ImageRelayError::Unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Send `request` upstream and return the response body verbatim
    pub async fn edit_image(&self, request: &ImageEditRequest) -> Result<Value, ImageRelayError> {
        let config = self.config.get();
        if !config.is_complete() {
            return Err(ImageRelayError::Configuration);
        }

        let url = config.edits_url();
        info!(
            url = %url,
            model = %request.model,
            prompt = %prompt_preview(&request.prompt),
            image = %request.image.original_name,
            image_bytes = request.image.size,
            has_mask = request.mask.is_some(),
            "Starting image edit request"
        );

        let form = build_form(request).await?;

        let result = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
            .multipart(form)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let err = ImageRelayError::from(e);
                error!(url = %url, kind = err.kind(), error = ?err, "Image edit request failed");
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ImageRelayError::from_upstream(status, &body);
            error!(
                url = %url,
                status = status.as_u16(),
                body = %body,
                "Image edit API returned an error"
            );
            return Err(err);
        }

        let body = response.bytes().await.map_err(ImageRelayError::from)?;
        info!(status = status.as_u16(), bytes = body.len(), "Image edit response received");

        serde_json::from_slice(&body).map_err(|e| {
            ImageRelayError::Unknown(format!("Image API returned an invalid JSON body: {e}"))
        })
    }
}

async fn build_form(request: &ImageEditRequest) -> Result<Form, ImageRelayError> {
    let mut form = Form::new()
        .part("image", file_part(&request.image).await?)
        .text("prompt", request.prompt.clone())
        .text("model", request.model.as_str());

    if let Some(mask) = &request.mask {
        form = form.part("mask", file_part(mask).await?);
    }
    if let Some(n) = request.n {
        form = form.text("n", n.to_string());
    }
    if let Some(quality) = &request.quality {
        form = form.text("quality", quality.clone());
    }
    if let Some(size) = &request.size {
        form = form.text("size", size.clone());
    }

    Ok(form)
}

async fn file_part(file: &UploadedFile) -> Result<Part, ImageRelayError> {
    let bytes = tokio::fs::read(&file.path).await.map_err(|e| {
        ImageRelayError::Unknown(format!(
            "Failed to read uploaded file {}: {e}",
            file.original_name
        ))
    })?;

    Part::bytes(bytes)
        .file_name(file.original_name.clone())
        .mime_str(&file.content_type)
        .map_err(|e| ImageRelayError::Unknown(format!("Invalid content type {}: {e}", file.content_type)))
}

/// First 100 characters of the prompt, for logs
fn prompt_preview(prompt: &str) -> String {
    const LIMIT: usize = 100;
    match prompt.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &prompt[..idx]),
        None => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_preview() {
        assert_eq!(prompt_preview("short"), "short");

        let long = "é".repeat(150);
        let preview = prompt_preview(&long);
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
    }
}
