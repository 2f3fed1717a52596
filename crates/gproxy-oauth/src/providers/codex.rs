use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::{OAuthError, OAuthResult};
use crate::jwt::{parse_codex_id_token, CodexIdTokenClaims};
use crate::pkce::{generate_pkce_pair, generate_state_token, PkcePair};
use crate::refresh::{RefreshedTokens, TokenRefresher};

pub const PROVIDER_TYPE: &str = "codex";
pub const DEFAULT_ISSUER: &str = "https://auth.openai.com";
const CLIENT_ID: &str = "app_EMoamEEZ73f0CkXaXp7hrann";
const OAUTH_SCOPE: &str = "openid profile email offline_access";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:1455/auth/callback";
pub const LEGACY_CALLBACK_PATH: &str = "/auth/callback";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    id_token: Option<String>,
    expires_in: Option<i64>,
}

pub struct AuthorizationStart {
    pub auth_url: String,
    pub state: String,
    pub pkce: PkcePair,
    pub redirect_uri: String,
}

pub fn start_authorization(redirect_uri: Option<&str>) -> AuthorizationStart {
    let pkce = generate_pkce_pair();
    let state = generate_state_token();
    let redirect_uri = redirect_uri.unwrap_or(DEFAULT_REDIRECT_URI).to_string();

    let query = [
        ("response_type", "code"),
        ("client_id", CLIENT_ID),
        ("redirect_uri", redirect_uri.as_str()),
        ("scope", OAUTH_SCOPE),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
        ("id_token_add_organizations", "true"),
        ("codex_cli_simplified_flow", "true"),
        ("state", state.as_str()),
    ];
    let qs = query
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let auth_url = format!("{}/oauth/authorize?{qs}", DEFAULT_ISSUER.trim_end_matches('/'));

    AuthorizationStart {
        auth_url,
        state,
        pkce,
        redirect_uri,
    }
}

pub struct ExchangedAccount {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
    pub expires_at: OffsetDateTime,
    pub claims: CodexIdTokenClaims,
}

pub async fn exchange_code(
    client: &wreq::Client,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> OAuthResult<ExchangedAccount> {
    let body = format!(
        "grant_type=authorization_code&code={}&redirect_uri={}&client_id={}&code_verifier={}",
        urlencoding::encode(code),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(CLIENT_ID),
        urlencoding::encode(code_verifier),
    );
    let response = post_form(client, &format!("{DEFAULT_ISSUER}/oauth/token"), body).await?;
    let Some(id_token) = response.id_token.clone() else {
        return Err(OAuthError::TokenExchange("missing id_token".to_string()));
    };
    let Some(refresh_token) = response.refresh_token.clone() else {
        return Err(OAuthError::TokenExchange("missing refresh_token".to_string()));
    };
    let claims = parse_codex_id_token(&id_token);

    Ok(ExchangedAccount {
        access_token: response.access_token,
        refresh_token,
        id_token,
        expires_at: expiry_from_seconds(response.expires_in),
        claims,
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

pub struct CodexTokenRefresher {
    client: wreq::Client,
}

impl CodexTokenRefresher {
    pub fn new(client: wreq::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenRefresher for CodexTokenRefresher {
    /// Requests `scope=openid profile email` on refresh so the response keeps carrying a fresh
    /// `id_token` (Codex otherwise omits it from refresh responses).
    async fn refresh(&self, refresh_token: &str) -> OAuthResult<RefreshedTokens> {
        let body = format!(
            "grant_type=refresh_token&refresh_token={}&client_id={}&scope=openid+profile+email",
            urlencoding::encode(refresh_token),
            urlencoding::encode(CLIENT_ID),
        );
        let response = post_form(&self.client, &format!("{DEFAULT_ISSUER}/oauth/token"), body).await?;
        let refresh_token = response
            .refresh_token
            .clone()
            .unwrap_or_else(|| refresh_token.to_string());
        Ok(RefreshedTokens {
            access_token: response.access_token,
            refresh_token,
            expires_at: expiry_from_seconds(response.expires_in),
            id_token: response.id_token,
        })
    }
}
