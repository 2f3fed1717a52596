use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::StreamExt;
use gproxy_adapters::Adapter;
use gproxy_common::Vault;
use gproxy_oauth::{CallOutcome, HealthState, PoolSelector};
use gproxy_protocol::sse::SseParser;
use gproxy_storage::{RequestLogDraft, Storage};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::circuit_breaker::CircuitBreaker;
use crate::client::UpstreamClient;
use crate::error::{BridgeError, BridgeResult};
use crate::model_mapping::resolve_target_model;
use crate::registry::AdapterRegistry;
use crate::retry::RetryPolicy;
use crate::route::{self, ResolvedRoute};

/// A chunk of an outgoing response body: either the framed bytes of one SSE event, or (for a
/// non-streaming call) the entire JSON body in one shot.
pub type BodyChunk = Result<Bytes, BridgeError>;

pub enum PipelineResponse {
    Once {
        status: u16,
        body: Bytes,
    },
    Stream {
        status: u16,
        body: ReceiverStream<BodyChunk>,
    },
}

/// Everything the bridge needs to route and authenticate a single inbound call.
pub struct Bridge {
    storage: Storage,
    vault: Arc<Vault>,
    registry: AdapterRegistry,
    client: UpstreamClient,
    retry_policy: RetryPolicy,
    circuit_breaker: CircuitBreaker,
    pool_selector: PoolSelector,
}

impl Bridge {
    pub fn new(storage: Storage, vault: Arc<Vault>) -> BridgeResult<Self> {
        Ok(Self {
            storage,
            vault,
            registry: AdapterRegistry::new(),
            client: UpstreamClient::new()?,
            retry_policy: RetryPolicy::default(),
            circuit_breaker: CircuitBreaker::new(5, std::time::Duration::from_secs(30)),
            pool_selector: PoolSelector::new(),
        })
    }

    /// Runs the full request/response bridge for one inbound call on `proxy_path`. `raw_body` is
    /// the untouched bytes of the client's request in its own dialect.
    pub async fn handle(&self, proxy_path: &str, raw_body: &[u8]) -> BridgeResult<PipelineResponse> {
        let started_at = Instant::now();
        let route = route::resolve_by_path(&self.storage, proxy_path).await?;
        let inbound = self.registry.get(&route.proxy.inbound_adapter_id)?;
        let outbound = self.registry.get(&route.provider.adapter_type)?;

        let mut ir = inbound.parse_request(raw_body)?;
        let source_model = ir.model.clone();
        ir.model = resolve_target_model(&route.mappings, &ir.model);
        let target_model = ir.model.clone();
        let streaming = ir.stream;

        let outbound_body = outbound.build_request(&ir)?;
        let circuit_key = route.provider.id.clone();

        if !self.circuit_breaker.allow(&circuit_key) {
            self.log(
                &route,
                &source_model,
                &target_model,
                None,
                None,
                None,
                started_at,
                Some(format!("circuit_open:{circuit_key}")),
            )
            .await;
            return Err(BridgeError::CircuitOpen(circuit_key));
        }

        let result = if streaming {
            self.run_streaming(
                &route,
                outbound_body,
                &source_model,
                &target_model,
                started_at,
                &inbound,
                &outbound,
            )
            .await
        } else {
            self.run_once(&route, outbound_body, &target_model, &inbound, &outbound)
                .await
        };

        match &result {
            Ok(PipelineResponse::Once { status, .. }) if (200..300).contains(status) => {
                self.circuit_breaker.record_success(&circuit_key);
            }
            Ok(PipelineResponse::Stream { status, .. }) if (200..300).contains(status) => {
                self.circuit_breaker.record_success(&circuit_key);
            }
            _ => self.circuit_breaker.record_failure(&circuit_key),
        }

        if let Ok(PipelineResponse::Once { status, body }) = &result {
            let usage = outbound
                .parse_response(body)
                .ok()
                .map(|response| response.usage);
            self.log(
                &route,
                &source_model,
                &target_model,
                Some(*status as i32),
                usage.as_ref().map(|usage| usage.prompt_tokens),
                usage.as_ref().map(|usage| usage.completion_tokens),
                started_at,
                None,
            )
            .await;
        }

        result
    }

    async fn run_once(
        &self,
        route: &ResolvedRoute,
        body: Vec<u8>,
        model: &str,
        inbound: &Arc<dyn Adapter>,
        outbound: &Arc<dyn Adapter>,
    ) -> BridgeResult<PipelineResponse> {
        let mut attempt = 0u32;
        let mut excluded = HashSet::new();
        loop {
            attempt += 1;
            let (target, account_id) = self.target_for_call(route, &excluded).await?;
            let send_result = self.client.send(&target, model, body.clone()).await;

            let response = match send_result {
                Ok(response) => response,
                Err(err) => {
                    if attempt <= self.retry_policy.max_retries {
                        tokio::time::sleep(self.retry_policy.backoff_delay(attempt)).await;
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status().as_u16();
            self.note_pool_outcome(route, account_id.as_deref(), status).await;

            if self.should_retry(route, status) && attempt <= self.retry_policy.max_retries {
                if let Some(id) = &account_id {
                    excluded.insert(id.clone());
                }
                tokio::time::sleep(self.retry_policy.backoff_delay(attempt)).await;
                continue;
            }

            let bytes = response.bytes().await.map_err(BridgeError::Http)?;
            if (200..300).contains(&status) {
                return Ok(PipelineResponse::Once { status, body: bytes });
            }
            let error_ir = outbound.parse_error(&bytes, status);
            let translated = inbound.build_error(&error_ir);
            return Ok(PipelineResponse::Once { status, body: Bytes::from(translated) });
        }
    }

    /// Whether a failed attempt should be retried against a different upstream target.
    /// Pool-backed providers also retry on 401/403 so a bad account can fail over to another one.
    fn should_retry(&self, route: &ResolvedRoute, status: u16) -> bool {
        self.retry_policy.should_retry(status)
            || (route.provider.is_pool && matches!(status, 401 | 403))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_streaming(
        &self,
        route: &ResolvedRoute,
        body: Vec<u8>,
        source_model: &str,
        target_model: &str,
        started_at: Instant,
        inbound: &Arc<dyn Adapter>,
        outbound: &Arc<dyn Adapter>,
    ) -> BridgeResult<PipelineResponse> {
        let mut attempt = 0u32;
        let mut excluded = HashSet::new();
        let (status, mut response) = loop {
            attempt += 1;
            let (target, account_id) = self.target_for_call(route, &excluded).await?;
            let send_result = self.client.send(&target, target_model, body.clone()).await;

            let response = match send_result {
                Ok(response) => response,
                Err(err) => {
                    if attempt <= self.retry_policy.max_retries {
                        tokio::time::sleep(self.retry_policy.backoff_delay(attempt)).await;
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status().as_u16();
            self.note_pool_outcome(route, account_id.as_deref(), status).await;

            if self.should_retry(route, status) && attempt <= self.retry_policy.max_retries {
                if let Some(id) = &account_id {
                    excluded.insert(id.clone());
                }
                tokio::time::sleep(self.retry_policy.backoff_delay(attempt)).await;
                continue;
            }

            break (status, response);
        };

        if !(200..300).contains(&status) {
            let bytes = response.bytes().await.unwrap_or_default();
            let error_ir = outbound.parse_error(&bytes, status);
            let translated = inbound.build_error(&error_ir);
            return Ok(PipelineResponse::Once { status, body: Bytes::from(translated) });
        }

        let outbound = outbound.clone();
        let mut stream_builder = inbound.create_stream_builder();

        let (tx, rx) = mpsc::channel::<BodyChunk>(32);

        let storage = self.storage.clone();
        let proxy_id = route.proxy.id.clone();
        let proxy_path = route.proxy.proxy_path.clone();
        let source_model = source_model.to_string();
        let target_model = target_model.to_string();

        tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut byte_stream = response.bytes_stream();
            let mut usage = None;
            let mut client_closed = false;

            'pump: loop {
                let item = match byte_stream.next().await {
                    Some(item) => item,
                    None => break,
                };
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        let _ = tx.send(Err(BridgeError::Http(err))).await;
                        break;
                    }
                };

                for frame in parser.push_bytes(&chunk) {
                    let Ok(Some(events)) = outbound.parse_stream_event(&frame) else {
                        continue;
                    };
                    for event in &events {
                        if let gproxy_ir::StreamEvent::End { usage: end_usage, .. } = event {
                            usage = Some(end_usage.clone());
                        }
                        for out_frame in stream_builder.process(event) {
                            if tx.send(Ok(out_frame.encode())).await.is_err() {
                                client_closed = true;
                                break 'pump;
                            }
                        }
                    }
                }
            }

            if !client_closed {
                for out_frame in stream_builder.finalize() {
                    if tx.send(Ok(out_frame.encode())).await.is_err() {
                        client_closed = true;
                        break;
                    }
                }
            }

            let draft = RequestLogDraft {
                proxy_id: Some(proxy_id),
                proxy_path,
                source_model: Some(source_model),
                target_model: Some(target_model),
                http_status: Some(status as i32),
                input_tokens: usage.as_ref().map(|usage: &gproxy_ir::Usage| usage.prompt_tokens),
                output_tokens: usage.as_ref().map(|usage: &gproxy_ir::Usage| usage.completion_tokens),
                latency_ms: Some(started_at.elapsed().as_millis() as i64),
                request_body: None,
                response_body: None,
                error: if client_closed { Some("client_closed".to_string()) } else { None },
                source: "bridge".to_string(),
            };
            if let Err(err) = storage.insert_request_log(Uuid::new_v4().to_string(), draft).await {
                tracing::warn!(error = %err, "failed to persist streaming request log");
            }
        });

        Ok(PipelineResponse::Stream {
            status,
            body: ReceiverStream::new(rx),
        })
    }

    /// Resolves the upstream target for one attempt. For pool providers, `excluded` accumulates
    /// account ids already tried this call so a 401/403 retry fails over to a different account
    /// instead of re-selecting the same one. Returns the account id actually selected (if any) so
    /// the caller can attribute the outcome of this specific attempt back to it.
    async fn target_for_call(
        &self,
        route: &ResolvedRoute,
        excluded: &HashSet<String>,
    ) -> BridgeResult<(crate::client::UpstreamTarget, Option<String>)> {
        if !route.provider.is_pool {
            let target = route::target_for_provider(&route.provider, &self.vault)?;
            return Ok((target, None));
        }

        let provider_type = route
            .provider
            .oauth_provider_type
            .clone()
            .ok_or_else(|| BridgeError::Other("pool provider missing oauth_provider_type".into()))?;
        let account_id = self
            .pool_selector
            .select(&self.storage, &provider_type, excluded)
            .await?;
        let account = self
            .storage
            .get_oauth_account(&account_id)
            .await?
            .ok_or_else(|| BridgeError::Other(format!("oauth account {account_id} vanished")))?;
        let access_token = self.vault.decrypt(&account.access_token_encrypted)?;

        Ok((
            crate::client::UpstreamTarget {
                base_url: route.provider.base_url.clone(),
                chat_path: route.provider.chat_path.clone(),
                adapter_type: route.provider.adapter_type.clone(),
                api_key: access_token,
            },
            Some(account_id),
        ))
    }

    async fn note_pool_outcome(&self, route: &ResolvedRoute, account_id: Option<&str>, status: u16) {
        if !route.provider.is_pool {
            return;
        }
        let Some(account_id) = account_id else {
            return;
        };
        let outcome = match status {
            200..=299 => CallOutcome::Success,
            401 => CallOutcome::Unauthorized,
            403 => CallOutcome::Forbidden,
            429 => CallOutcome::RateLimited,
            _ => CallOutcome::OtherFailure,
        };
        if outcome == CallOutcome::Success {
            if let Some(provider_type) = &route.provider.oauth_provider_type {
                self.pool_selector.record_success(provider_type, account_id);
            }
            let _ = self.storage.touch_oauth_account_used(account_id).await;
            return;
        }
        let state = HealthState::active().apply(outcome, Some(format!("upstream status {status}")));
        let _ = self
            .storage
            .record_oauth_failure(account_id, &state.status, state.error_message)
            .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn log(
        &self,
        route: &ResolvedRoute,
        source_model: &str,
        target_model: &str,
        http_status: Option<i32>,
        input_tokens: Option<i64>,
        output_tokens: Option<i64>,
        started_at: Instant,
        error: Option<String>,
    ) {
        let draft = RequestLogDraft {
            proxy_id: Some(route.proxy.id.clone()),
            proxy_path: route.proxy.proxy_path.clone(),
            source_model: Some(source_model.to_string()),
            target_model: Some(target_model.to_string()),
            http_status,
            input_tokens,
            output_tokens,
            latency_ms: Some(started_at.elapsed().as_millis() as i64),
            request_body: None,
            response_body: None,
            error,
            source: "bridge".to_string(),
        };
        if let Err(err) = self.storage.insert_request_log(Uuid::new_v4().to_string(), draft).await {
            tracing::warn!(error = %err, "failed to persist request log");
        }
    }
}
