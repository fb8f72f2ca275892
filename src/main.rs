use clap::Parser;
use stream_json_etl::utils::error::{EtlError, ErrorSeverity};
use stream_json_etl::utils::{logger, validation::Validate};
use stream_json_etl::{CliConfig, ConfigProvider, EtlEngine, TomlConfig};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting stream-json-etl");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let result = match cli.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match TomlConfig::from_file(&path) {
                Ok(config) => execute(config, cli.monitor).await,
                Err(e) => Err(e),
            }
        }
        None => execute(cli.clone(), cli.monitor).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn execute<C: ConfigProvider + Validate>(
    config: C,
    monitor_flag: bool,
) -> Result<(), EtlError> {
    config.validate()?;
    let monitor_enabled = monitor_flag || config.monitoring_enabled();

    let engine = EtlEngine::new_with_monitoring(config, monitor_enabled);
    let summary = engine.run().await?;

    tracing::info!(
        "✅ {} records piped in {} ms",
        summary.records_processed,
        summary.elapsed().num_milliseconds()
    );
    println!("✅ Data piping and transformation completed");
    println!("📁 Output saved to: {}", summary.destination.display());
    Ok(())
}
