use clap::Parser;
use fare_stream::utils::error::{AggregatorError, ErrorSeverity};
use fare_stream::utils::{logger, validation::Validate};
use fare_stream::{CliConfig, FrameWriter, SearchAggregator, StreamSummary};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌（stdout 留給事件串流）
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting fare-stream CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&config).await {
        Ok(summary) => {
            tracing::info!(
                "✅ Stream finished: {} frames in {} ms",
                summary.frames,
                summary.elapsed.as_millis()
            );
        }
        Err(e) => {
            tracing::error!(
                "❌ Fare search failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0, // 客戶端關閉 stdout
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run(config: &CliConfig) -> Result<StreamSummary, AggregatorError> {
    let aggregator_config = config.load_aggregator_config()?;
    let query = config.load_query()?;
    let credentials = config.credentials();

    let aggregator = SearchAggregator::new(aggregator_config)?;

    // Ctrl-C 視同客戶端離開：中止進行中的供應商請求
    let disconnect = CancellationToken::new();
    let on_interrupt = disconnect.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut writer = FrameWriter::new(tokio::io::stdout()).with_disconnect(disconnect);
    aggregator.run(&query, &credentials, &mut writer).await
}
