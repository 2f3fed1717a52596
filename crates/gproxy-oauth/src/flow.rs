use std::sync::Arc;

use gproxy_common::Vault;
use gproxy_storage::{OAuthAccountDraft, Storage};

use crate::callback::await_authorization_code;
use crate::error::{OAuthError, OAuthResult};
use crate::providers::{antigravity, codex};

/// Ports 1455 (Codex) and 51121 (Antigravity) match each provider's default redirect URI; a
/// custom redirect URI must still resolve to one of these loopback ports for the listener to
/// catch the callback.
fn loopback_port(provider_type: &str) -> OAuthResult<u16> {
    match provider_type {
        codex::PROVIDER_TYPE => Ok(1455),
        antigravity::PROVIDER_TYPE => Ok(51121),
        other => Err(OAuthError::Other(format!("unknown provider type {other}"))),
    }
}

/// Drives one full authorization-code round trip: builds the authorize URL, opens the loopback
/// listener, waits for the callback, exchanges the code, encrypts the resulting tokens, and
/// persists a new OAuthAccount row.
pub async fn authorize(
    storage: &Storage,
    vault: &Arc<Vault>,
    client: &wreq::Client,
    provider_type: &str,
) -> OAuthResult<(String, String)> {
    let port = loopback_port(provider_type)?;

    match provider_type {
        codex::PROVIDER_TYPE => {
            let start = codex::start_authorization(None);
            open_external(&start.auth_url);
            let callback = await_authorization_code(
                port,
                provider_type,
                Some(codex::LEGACY_CALLBACK_PATH),
            )
            .await?;
            if callback.state.as_deref() != Some(start.state.as_str()) {
                return Err(OAuthError::StateMismatch);
            }
            let exchanged = codex::exchange_code(
                client,
                &callback.code,
                &start.redirect_uri,
                &start.pkce.verifier,
            )
            .await?;

            let id = uuid::Uuid::new_v4().to_string();
            let draft = OAuthAccountDraft {
                provider_type: provider_type.to_string(),
                email: exchanged
                    .claims
                    .email
                    .clone()
                    .unwrap_or_else(|| format!("codex:{id}")),
                access_token_encrypted: vault.encrypt(&exchanged.access_token)?,
                refresh_token_encrypted: vault.encrypt(&exchanged.refresh_token)?,
                expires_at: exchanged.expires_at,
                token_type: "Bearer".to_string(),
                pool_enabled: true,
                pool_weight: 0,
                metadata_json: serde_json::json!({
                    "idToken": exchanged.id_token,
                    "plan": exchanged.claims.plan,
                    "accountId": exchanged.claims.account_id,
                }),
            };
            let account = storage.create_oauth_account(id, draft).await?;
            Ok((account.id, account.email))
        }
        antigravity::PROVIDER_TYPE => {
            let start = antigravity::start_authorization(None);
            open_external(&start.auth_url);
            let callback = await_authorization_code(
                port,
                provider_type,
                Some(antigravity::LEGACY_CALLBACK_PATH),
            )
            .await?;
            if callback.state.as_deref() != Some(start.state.as_str()) {
                return Err(OAuthError::StateMismatch);
            }
            let exchanged =
                antigravity::exchange_code(client, &callback.code, &start.redirect_uri).await?;

            let id = uuid::Uuid::new_v4().to_string();
            let draft = OAuthAccountDraft {
                provider_type: provider_type.to_string(),
                email: format!("antigravity:{}", exchanged.project_id),
                access_token_encrypted: vault.encrypt(&exchanged.access_token)?,
                refresh_token_encrypted: vault.encrypt(&exchanged.refresh_token)?,
                expires_at: exchanged.expires_at,
                token_type: "Bearer".to_string(),
                pool_enabled: true,
                pool_weight: 0,
                metadata_json: serde_json::json!({
                    "projectId": exchanged.project_id,
                    "subscriptionTier": exchanged.subscription_tier,
                }),
            };
            let account = storage.create_oauth_account(id, draft).await?;
            Ok((account.id, account.email))
        }
        other => Err(OAuthError::Other(format!("unknown provider type {other}"))),
    }
}

/// Best-effort: failure to launch a browser should not fail the flow, the caller can still open
/// `auth_url` manually.
fn open_external(url: &str) {
    #[cfg(target_os = "macos")]
    let _ = std::process::Command::new("open").arg(url).spawn();
    #[cfg(target_os = "linux")]
    let _ = std::process::Command::new("xdg-open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let _ = std::process::Command::new("cmd")
        .args(["/C", "start", url])
        .spawn();
}
