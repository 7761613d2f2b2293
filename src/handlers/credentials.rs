use crate::config::{self, Credentials, Environment};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Saved-credential view with the token masked. The full token never leaves
/// the server once stored.
#[derive(Serialize, Debug, Clone)]
pub struct SavedCredentials {
    pub environment: Environment,
    pub account_id: String,
    pub access_token_masked: String,
}

/// Per-environment setup status for the dashboard's setup page.
#[derive(Serialize, Debug, Clone, Default)]
pub struct CredentialsStatus {
    pub demo: Option<SavedCredentials>,
    pub live: Option<SavedCredentials>,
}

#[derive(Deserialize, Debug)]
pub struct SaveCredentialsRequest {
    pub environment: Environment,
    pub account_id: String,
    pub access_token: String,
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "••••".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("••••{}", tail)
}

fn saved_view(creds: &Credentials) -> SavedCredentials {
    SavedCredentials {
        environment: creds.environment,
        account_id: creds.account_id.clone(),
        access_token_masked: mask_token(&creds.access_token),
    }
}

/// Report which environments have credentials saved.
pub async fn get_credentials(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CredentialsStatus>), (StatusCode, Json<String>)> {
    let status = CredentialsStatus {
        demo: config::peek(&state.config_dir, Environment::Demo)
            .as_ref()
            .map(saved_view),
        live: config::peek(&state.config_dir, Environment::Live)
            .as_ref()
            .map(saved_view),
    };
    Ok((StatusCode::OK, Json(status)))
}

/// Save (or overwrite) the credentials for one environment.
#[axum::debug_handler]
pub async fn save_credentials(
    State(state): State<AppState>,
    Json(req): Json<SaveCredentialsRequest>,
) -> Result<(StatusCode, Json<SavedCredentials>), (StatusCode, Json<String>)> {
    let creds = Credentials {
        account_id: req.account_id.trim().to_string(),
        access_token: req.access_token.trim().to_string(),
        environment: req.environment,
    };

    config::save(&state.config_dir, &creds)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?;

    // New credentials may point at a different account; the old history is
    // meaningless now.
    state.invalidate(Some(req.environment)).await;

    tracing::info!("saved {} credentials", req.environment);
    Ok((StatusCode::CREATED, Json(saved_view(&creds))))
}
