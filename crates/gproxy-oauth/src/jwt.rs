use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

/// Claims this daemon cares about from a Codex `id_token`. The token's signature is not
/// verified: it arrived over the provider's own TLS-protected token endpoint, and the only use
/// made of it here is reading the profile fields it carries.
#[derive(Debug, Clone, Default)]
pub struct CodexIdTokenClaims {
    pub email: Option<String>,
    pub plan: Option<String>,
    pub account_id: Option<String>,
}

pub fn parse_codex_id_token(id_token: &str) -> CodexIdTokenClaims {
    let mut claims = CodexIdTokenClaims::default();
    let mut parts = id_token.split('.');
    let (Some(_header), Some(payload_b64), Some(_sig)) = (parts.next(), parts.next(), parts.next())
    else {
        return claims;
    };
    let Ok(payload_bytes) = URL_SAFE_NO_PAD.decode(payload_b64) else {
        return claims;
    };
    let Ok(payload) = serde_json::from_slice::<Value>(&payload_bytes) else {
        return claims;
    };

    claims.email = payload
        .get("email")
        .and_then(Value::as_str)
        .or_else(|| {
            payload
                .get("https://api.openai.com/profile")
                .and_then(|profile| profile.get("email"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);

    if let Some(auth) = payload.get("https://api.openai.com/auth") {
        claims.plan = auth
            .get("chatgpt_plan_type")
            .and_then(Value::as_str)
            .map(str::to_string);
        claims.account_id = auth
            .get("chatgpt_account_id")
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    claims
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_segment(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn extracts_email_and_plan_from_nested_claim() {
        let payload = serde_json::json!({
            "email": "dev@example.com",
            "https://api.openai.com/auth": {
                "chatgpt_plan_type": "pro",
                "chatgpt_account_id": "acct_1",
            }
        });
        let token = format!(
            "{}.{}.{}",
            encode_segment(&serde_json::json!({"alg": "none"})),
            encode_segment(&payload),
            "sig"
        );
        let claims = parse_codex_id_token(&token);
        assert_eq!(claims.email.as_deref(), Some("dev@example.com"));
        assert_eq!(claims.plan.as_deref(), Some("pro"));
        assert_eq!(claims.account_id.as_deref(), Some("acct_1"));
    }

    #[test]
    fn malformed_token_yields_empty_claims() {
        let claims = parse_codex_id_token("not-a-jwt");
        assert!(claims.email.is_none());
    }
}
