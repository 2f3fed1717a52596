use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::{OAuthError, OAuthResult};
use crate::pkce::generate_state_token;
use crate::refresh::{RefreshedTokens, TokenRefresher};

pub const PROVIDER_TYPE: &str = "antigravity";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CLOUD_CODE_BASE_URL: &str = "https://daily-cloudcode-pa.sandbox.googleapis.com";
const CLIENT_ID: &str = "1071006060591-tmhssin2h21lcre235vtolojh4g403ep.apps.googleusercontent.com";
const CLIENT_SECRET: &str = "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";
const OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/userinfo.profile";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:51121/oauth-callback";
pub const LEGACY_CALLBACK_PATH: &str = "/google/callback";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

pub struct AuthorizationStart {
    pub auth_url: String,
    pub state: String,
    pub redirect_uri: String,
}

/// Antigravity does not use PKCE; the authorize URL carries only `client_id`/`state`.
pub fn start_authorization(redirect_uri: Option<&str>) -> AuthorizationStart {
    let state = generate_state_token();
    let redirect_uri = redirect_uri.unwrap_or(DEFAULT_REDIRECT_URI).to_string();

    let query = [
        ("response_type", "code"),
        ("client_id", CLIENT_ID),
        ("redirect_uri", redirect_uri.as_str()),
        ("scope", OAUTH_SCOPE),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("state", state.as_str()),
    ];
    let qs = query
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let auth_url = format!("{}?{qs}", AUTH_URL.trim_end_matches('/'));

    AuthorizationStart {
        auth_url,
        state,
        redirect_uri,
    }
}

pub struct ExchangedAccount {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: OffsetDateTime,
    pub project_id: String,
    pub subscription_tier: String,
}

pub async fn exchange_code(
    client: &wreq::Client,
    code: &str,
    redirect_uri: &str,
) -> OAuthResult<ExchangedAccount> {
    let body = format!(
        "code={}&client_id={}&client_secret={}&redirect_uri={}&grant_type=authorization_code",
        urlencoding::encode(code),
        urlencoding::encode(CLIENT_ID),
        urlencoding::encode(CLIENT_SECRET),
        urlencoding::encode(redirect_uri),
    );
    let response = post_form(client, TOKEN_URL, body).await?;
    let Some(refresh_token) = response.refresh_token.clone() else {
        return Err(OAuthError::TokenExchange("missing refresh_token".to_string()));
    };

    let (project_id, subscription_tier) =
        load_code_assist_project(client, &response.access_token).await?;

    Ok(ExchangedAccount {
        access_token: response.access_token,
        refresh_token,
        expires_at: expiry_from_seconds(response.expires_in),
        project_id,
        subscription_tier,
    })
}

fn expiry_from_seconds(expires_in: Option<i64>) -> OffsetDateTime {
    OffsetDateTime::now_utc() + time::Duration::seconds(expires_in.unwrap_or(3600))
}

async fn post_form(client: &wreq::Client, url: &str, body: String) -> OAuthResult<TokenResponse> {
    let response = client
        .post(url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(OAuthError::TokenExchange(format!(
            "{status}: {}",
            String::from_utf8_lossy(&bytes)
        )));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Calls `loadCodeAssist` for the project id and subscription tier (`paidTier.id` preferred over
/// `currentTier.id`, defaulting to `FREE`); falls back to `onboardUser` when `loadCodeAssist`
/// reports no current tier yet.
async fn load_code_assist_project(
    client: &wreq::Client,
    access_token: &str,
) -> OAuthResult<(String, String)> {
    let body = serde_json::json!({
        "metadata": {"ideType": "ANTIGRAVITY", "platform": "PLATFORM_UNSPECIFIED", "pluginType": "GEMINI"}
    });
    let response = client
        .post(format!("{CLOUD_CODE_BASE_URL}/v1internal:loadCodeAssist"))
        .bearer_auth(access_token)
        .json(&body)
        .send()
        .await?;
    let status = response.status();
    let payload: serde_json::Value = response.json().await?;
    if !status.is_success() {
        return Err(OAuthError::Other(format!("loadCodeAssist failed: {status}")));
    }

    let project_id = payload
        .get("cloudaicompanionProject")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let tier = payload
        .get("paidTier")
        .or_else(|| payload.get("currentTier"))
        .and_then(|tier| tier.get("id"))
        .and_then(|v| v.as_str())
        .unwrap_or("FREE")
        .to_string();

    if let Some(project_id) = project_id {
        return Ok((project_id, tier));
    }

    onboard_user(client, access_token, &tier).await
}

async fn onboard_user(
    client: &wreq::Client,
    access_token: &str,
    tier_id: &str,
) -> OAuthResult<(String, String)> {
    let body = serde_json::json!({
        "tierId": tier_id,
        "metadata": {"ideType": "ANTIGRAVITY", "platform": "PLATFORM_UNSPECIFIED", "pluginType": "GEMINI"}
    });
    let response = client
        .post(format!("{CLOUD_CODE_BASE_URL}/v1internal:onboardUser"))
        .bearer_auth(access_token)
        .json(&body)
        .send()
        .await?;
    let status = response.status();
    let payload: serde_json::Value = response.json().await?;
    if !status.is_success() {
        return Err(OAuthError::Other(format!("onboardUser failed: {status}")));
    }
    let project_id = payload
        .get("response")
        .and_then(|r| r.get("cloudaicompanionProject"))
        .and_then(|p| p.get("id"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    Ok((project_id, tier_id.to_string()))
}

#[derive(Debug, Clone)]
pub struct ModelQuota {
    pub model: String,
    pub remaining_percent: f64,
    pub resets_at: Option<OffsetDateTime>,
}

/// Maps each model's `quotaInfo.remainingFraction` to a percentage. A 403 response means the
/// caller should mark the account `forbidden` rather than retry.
pub async fn fetch_quota(
    client: &wreq::Client,
    access_token: &str,
) -> OAuthResult<Vec<ModelQuota>> {
    let response = client
        .post(format!("{CLOUD_CODE_BASE_URL}/v1internal:fetchAvailableModels"))
        .bearer_auth(access_token)
        .json(&serde_json::json!({}))
        .send()
        .await?;
    let status = response.status();
    if status.as_u16() == 403 {
        return Err(OAuthError::Other("quota_forbidden".to_string()));
    }
    let payload: serde_json::Value = response.json().await?;
    if !status.is_success() {
        return Err(OAuthError::Other(format!("fetchAvailableModels failed: {status}")));
    }

    let models = payload
        .get("models")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(models
        .into_iter()
        .filter_map(|model| {
            let name = model.get("name")?.as_str()?.to_string();
            let fraction = model
                .get("quotaInfo")
                .and_then(|q| q.get("remainingFraction"))
                .and_then(|v| v.as_f64())
                .unwrap_or(1.0);
            let resets_at = model
                .get("quotaInfo")
                .and_then(|q| q.get("resetTime"))
                .and_then(|v| v.as_str())
                .and_then(|s| OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339).ok());
            Some(ModelQuota {
                model: name,
                remaining_percent: fraction * 100.0,
                resets_at,
            })
        })
        .collect())
}

pub struct AntigravityTokenRefresher {
    client: wreq::Client,
}

impl AntigravityTokenRefresher {
    pub fn new(client: wreq::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenRefresher for AntigravityTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> OAuthResult<RefreshedTokens> {
        let body = format!(
            "refresh_token={}&client_id={}&client_secret={}&grant_type=refresh_token",
            urlencoding::encode(refresh_token),
            urlencoding::encode(CLIENT_ID),
            urlencoding::encode(CLIENT_SECRET),
        );
        let response = post_form(&self.client, TOKEN_URL, body).await?;
        let refresh_token = response
            .refresh_token
            .clone()
            .unwrap_or_else(|| refresh_token.to_string());
        Ok(RefreshedTokens {
            access_token: response.access_token,
            refresh_token,
            expires_at: expiry_from_seconds(response.expires_in),
            id_token: None,
        })
    }
}
