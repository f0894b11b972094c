use crate::domain::model::{ProviderKind, ProviderOutcome, ProviderRequest};
use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// 一個供應商在本次查詢中的處理方式
#[derive(Debug, Clone)]
pub enum DispatchPlan {
    Send(ProviderRequest),
    Skip { provider: ProviderKind, reason: String },
}

impl DispatchPlan {
    pub fn provider(&self) -> ProviderKind {
        match self {
            DispatchPlan::Send(request) => request.provider,
            DispatchPlan::Skip { provider, .. } => *provider,
        }
    }
}

/// 每個傳輸各自的時間上限（連線逾時設定在共用的 client 上）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLimits {
    pub total_timeout: Duration,
    /// 沒有收到任何位元組超過此時間即中止
    pub stall_timeout: Duration,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(30),
            stall_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    limits: TransferLimits,
}

impl Dispatcher {
    pub fn new(client: reqwest::Client, limits: TransferLimits) -> Self {
        Self { client, limits }
    }

    pub fn limits(&self) -> TransferLimits {
        self.limits
    }

    /// 每個要送出的請求各開一個 task；略過的供應商直接排入佇列最前面
    pub fn dispatch(&self, plans: Vec<DispatchPlan>) -> InFlight {
        let mut in_flight = InFlight {
            ready: VecDeque::new(),
            tasks: JoinSet::new(),
            pending: HashMap::new(),
        };

        for plan in plans {
            match plan {
                DispatchPlan::Skip { provider, reason } => {
                    debug!(provider = %provider, reason = %reason, "Provider skipped");
                    in_flight
                        .ready
                        .push_back((provider, ProviderOutcome::Skipped { reason }));
                }
                DispatchPlan::Send(request) => {
                    let provider = request.provider;
                    let client = self.client.clone();
                    let limits = self.limits;

                    in_flight.tasks.spawn(async move {
                        let outcome = AssertUnwindSafe(execute(&client, &request, limits))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|panic| ProviderOutcome::TransportError {
                                message: format!("provider task panicked: {}", panic_message(&*panic)),
                            });
                        (provider, outcome)
                    });
                    in_flight.pending.insert(provider, Instant::now());
                }
            }
        }

        in_flight
    }
}

/// 進行中的請求集合；drop 時所有尚未完成的傳輸都會被中止
pub struct InFlight {
    ready: VecDeque<(ProviderKind, ProviderOutcome)>,
    tasks: JoinSet<(ProviderKind, ProviderOutcome)>,
    pending: HashMap<ProviderKind, Instant>,
}

impl InFlight {
    /// 依完成順序取出下一個結果，全部結束後回傳 `None`。
    ///
    /// 可安全地放在 `tokio::select!` 中：狀態只在 await 完成後才變動。
    pub async fn next(&mut self) -> Option<(ProviderKind, ProviderOutcome)> {
        if let Some(ready) = self.ready.pop_front() {
            return Some(ready);
        }

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((provider, outcome)) => {
                    if let Some(started) = self.pending.remove(&provider) {
                        info!(
                            provider = %provider,
                            outcome = ?outcome.kind(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Provider completed"
                        );
                    }
                    return Some((provider, outcome));
                }
                // panic 已在 task 內攔截，這裡只剩被取消的 task
                Err(join_error) => {
                    debug!(error = %join_error, "Provider task ended without an outcome");
                }
            }
        }

        // 每個供應商都必須有一個結果
        let provider = self.pending.keys().min().copied()?;
        self.pending.remove(&provider);
        Some((
            provider,
            ProviderOutcome::TransportError {
                message: "provider task was cancelled".to_string(),
            },
        ))
    }

    pub fn pending_providers(&self) -> Vec<ProviderKind> {
        let mut providers: Vec<ProviderKind> = self.pending.keys().copied().collect();
        providers.sort();
        providers
    }

    /// 尚未交出的結果數量
    pub fn remaining(&self) -> usize {
        self.ready.len() + self.pending.len()
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// 客戶端斷線時呼叫：中止所有傳輸，之後不再產生任何結果
    pub fn abort_all(&mut self) {
        if !self.pending.is_empty() {
            warn!(providers = ?self.pending_providers(), "Aborting in-flight provider requests");
        }
        self.tasks.abort_all();
        self.pending.clear();
        self.ready.clear();
    }
}

async fn execute(
    client: &reqwest::Client,
    request: &ProviderRequest,
    limits: TransferLimits,
) -> ProviderOutcome {
    debug!(provider = %request.provider, url = %request.url, "Sending provider request");

    let mut builder = client
        .post(&request.url)
        .timeout(limits.total_timeout)
        .body(request.body.clone());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    // 等待回應標頭同樣受停滯逾時限制
    let response = match tokio::time::timeout(limits.stall_timeout, builder.send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => return transport_failure(request.provider, describe_error(&e)),
        Err(_) => return transport_failure(request.provider, stalled(limits.stall_timeout)),
    };

    let status = response.status().as_u16();
    match read_body(response, limits.stall_timeout).await {
        Ok(raw_body) => {
            let outcome = request.provider.classify(status, &raw_body);
            match &outcome {
                ProviderOutcome::UpstreamError { message } => {
                    warn!(provider = %request.provider, http_status = status, reason = %message, "Upstream reported failure");
                }
                ProviderOutcome::MalformedResponse { .. } => {
                    warn!(provider = %request.provider, http_status = status, body_bytes = raw_body.len(), "Upstream returned invalid JSON");
                }
                _ => {
                    debug!(provider = %request.provider, http_status = status, body_bytes = raw_body.len(), "Response received");
                }
            }
            outcome
        }
        Err(message) => transport_failure(request.provider, message),
    }
}

async fn read_body(
    mut response: reqwest::Response,
    stall_timeout: Duration,
) -> std::result::Result<String, String> {
    let mut body = Vec::new();
    loop {
        match tokio::time::timeout(stall_timeout, response.chunk()).await {
            Ok(Ok(Some(chunk))) => body.extend_from_slice(&chunk),
            Ok(Ok(None)) => break,
            Ok(Err(e)) => return Err(describe_error(&e)),
            Err(_) => return Err(stalled(stall_timeout)),
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn transport_failure(provider: ProviderKind, message: String) -> ProviderOutcome {
    warn!(provider = %provider, error = %message, "Provider transport failed");
    ProviderOutcome::TransportError { message }
}

fn stalled(stall_timeout: Duration) -> String {
    format!("transfer stalled: no data received for {:?}", stall_timeout)
}

/// reqwest 的錯誤訊息本身很簡短，把底層原因串起來
fn describe_error(error: &reqwest::Error) -> String {
    let mut message = if error.is_timeout() {
        format!("operation timed out: {}", error)
    } else {
        error.to_string()
    };

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
