//! Image edit and upstream API configuration handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use classroom_core::models::{BroadcastMessage, ImageEditRequest, ImageModel, SessionId};
use classroom_core::service::ApiConfig;
use classroom_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::http::upload::{read_edit_form, EditForm};
use crate::http::{AppError, AppResult, AppState};

/// Relay an edit to the upstream image API and fan the outcome out to the session room
pub async fn edit_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut form = EditForm::default();

    let result = match read_edit_form(&mut multipart, &state.uploads, &mut form).await {
        Ok(()) => process_edit(&state, &form).await,
        Err(err) => Err(err),
    };

    form.cleanup().await;
    result.map(Json)
}

async fn process_edit(state: &AppState, form: &EditForm) -> AppResult<Value> {
    let request = build_edit_request(form)?;
    let session_id = form.field("sessionId").map(SessionId::from);

    info!(
        session_id = session_id.as_ref().map(SessionId::as_str),
        model = request.model.as_str(),
        images = form.images.len(),
        has_mask = request.mask.is_some(),
        "Image edit requested"
    );

    if let Some(session_id) = &session_id {
        state.relay.broadcast_to_session(
            session_id,
            BroadcastMessage::generation_start(json!({
                "prompt": request.prompt,
                "model": request.model.as_str(),
            })),
        );
    }

    match state.image_client.edit_image(&request).await {
        Ok(result) => {
            if let Some(session_id) = &session_id {
                state.relay.broadcast_result(session_id, Ok(&result));
            }
            Ok(result)
        }
        Err(err) => {
            let message = err.to_string();
            error!(kind = err.kind(), error = %message, "Image edit failed");
            if let Some(session_id) = &session_id {
                state.relay.broadcast_result(session_id, Err(&message));
            }
            Err(AppError::internal_server_error(message))
        }
    }
}

/// Validate the parsed form, in the order clients expect the errors
fn build_edit_request(form: &EditForm) -> classroom_core::Result<ImageEditRequest> {
    let required = |what: &str| Error::InvalidInput(format!("{what} is required"));

    let image = form
        .images
        .first()
        .cloned()
        .ok_or_else(|| required("Image file"))?;

    let prompt = form.field("prompt").ok_or_else(|| required("Prompt"))?;

    let model = form
        .field("model")
        .ok_or_else(|| required("Model"))?
        .parse::<ImageModel>()
        .map_err(Error::InvalidInput)?;

    Ok(ImageEditRequest {
        image,
        prompt: prompt.to_string(),
        model,
        mask: form.mask.clone(),
        n: form.field("n").and_then(|n| n.trim().parse().ok()),
        quality: form.field("quality").map(str::to_string),
        size: form.field("size").map(str::to_string),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfigResponse {
    pub base_url: String,
    pub has_api_key: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiConfigRequest {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Current upstream settings; the key itself is never returned
pub async fn get_api_config(State(state): State<AppState>) -> Json<ApiConfigResponse> {
    let config = state.api_config.get();
    Json(ApiConfigResponse {
        has_api_key: config.has_api_key(),
        base_url: config.base_url,
    })
}

pub async fn update_api_config(
    State(state): State<AppState>,
    Json(req): Json<UpdateApiConfigRequest>,
) -> AppResult<Json<Value>> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(base_url), Some(api_key)) = (non_empty(req.base_url), non_empty(req.api_key)) else {
        return Err(Error::InvalidInput("baseUrl and apiKey are required".to_string()).into());
    };

    state.api_config.update(ApiConfig::new(base_url, api_key));

    Ok(Json(json!({ "message": "API configuration updated successfully" })))
}
