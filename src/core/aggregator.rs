use crate::config::toml_config::AggregatorConfig;
use crate::core::dispatcher::{DispatchPlan, Dispatcher};
use crate::core::emitter::Emitter;
use crate::domain::model::{Credentials, OutcomeKind, SearchQuery, NO_DATA_FOUND};
use crate::domain::ports::EventSink;
use crate::utils::error::{AggregatorError, Result};
use crate::utils::validation::Validate;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 單次查詢的串流結果統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames: usize,
    pub succeeded: usize,
    pub upstream_errors: usize,
    pub transport_errors: usize,
    pub malformed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

impl StreamSummary {
    fn record(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Success => self.succeeded += 1,
            OutcomeKind::UpstreamError => self.upstream_errors += 1,
            OutcomeKind::TransportError => self.transport_errors += 1,
            OutcomeKind::MalformedResponse => self.malformed += 1,
            OutcomeKind::Skipped => self.skipped += 1,
        }
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Success => self.succeeded,
            OutcomeKind::UpstreamError => self.upstream_errors,
            OutcomeKind::TransportError => self.transport_errors,
            OutcomeKind::MalformedResponse => self.malformed,
            OutcomeKind::Skipped => self.skipped,
        }
    }
}

enum Step<T> {
    Disconnected,
    Completed(Option<T>),
}

/// 查詢驗證 → 組請求 → 並行分派 → 依完成順序串流
pub struct SearchAggregator {
    config: AggregatorConfig,
    dispatcher: Dispatcher,
}

impl SearchAggregator {
    /// 驗證配置並建立共用的 HTTP client
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent())
            .build()?;
        let dispatcher = Dispatcher::new(client, config.transfer_limits());

        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// 每個啟用中的供應商產生一個計畫（略過或送出）
    pub fn plan(&self, query: &SearchQuery, credentials: &Credentials) -> Result<Vec<DispatchPlan>> {
        let pax_types = query.requested_passenger_types();

        self.config
            .enabled_providers()
            .map(|provider| {
                if provider.kind.should_skip(&pax_types) {
                    Ok(DispatchPlan::Skip {
                        provider: provider.kind,
                        reason: NO_DATA_FOUND.to_string(),
                    })
                } else {
                    provider
                        .kind
                        .build_request(&provider.endpoint, query, credentials)
                        .map(DispatchPlan::Send)
                }
            })
            .collect()
    }

    /// 執行一次查詢，把每個供應商的結果寫成一個 frame。
    ///
    /// 單一供應商失敗不會中斷串流；只有查詢無效或客戶端斷線才會回傳錯誤，
    /// 斷線時所有進行中的傳輸會先被中止。
    pub async fn run<S: EventSink + ?Sized>(
        &self,
        query: &SearchQuery,
        credentials: &Credentials,
        sink: &mut S,
    ) -> Result<StreamSummary> {
        query.validate()?;

        let started = Instant::now();
        info!(
            dossier = %query.dossier_id,
            routes = query.routes.len(),
            passengers = query.total_passengers(),
            normalize = self.config.normalize(),
            "Starting fare search"
        );

        let plans = self.plan(query, credentials)?;
        let mut in_flight = self.dispatcher.dispatch(plans);
        let mut emitter = Emitter::new(sink, self.config.frame_pacing());
        let mut summary = StreamSummary::default();

        loop {
            let step = tokio::select! {
                biased;
                _ = emitter.closed() => Step::Disconnected,
                next = in_flight.next() => Step::Completed(next),
            };

            let (provider, outcome) = match step {
                Step::Completed(Some(completed)) => completed,
                Step::Completed(None) => break,
                Step::Disconnected => {
                    in_flight.abort_all();
                    warn!(frames = emitter.frames(), "Client disconnected mid-stream");
                    return Err(AggregatorError::ClientDisconnected {
                        message: "client closed the stream".to_string(),
                    });
                }
            };

            let event = provider.event_for(&outcome, self.config.normalize());
            if let Err(e) = emitter.emit(&event).await {
                in_flight.abort_all();
                warn!(provider = %provider, error = %e, "Failed to deliver frame");
                return Err(e);
            }
            summary.record(outcome.kind());
        }

        summary.frames = emitter.close().await?;
        summary.elapsed = started.elapsed();

        info!(
            frames = summary.frames,
            succeeded = summary.succeeded,
            failed = summary.upstream_errors + summary.transport_errors + summary.malformed,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Finished streaming provider responses"
        );

        Ok(summary)
    }
}
