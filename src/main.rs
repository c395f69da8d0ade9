use clap::Parser;
use fuel_report_bot::config::load_env_file;
use fuel_report_bot::core::ConfigProvider;
use fuel_report_bot::domain::model::FuelFamily;
use fuel_report_bot::utils::error::ErrorSeverity;
use fuel_report_bot::utils::{logger, validation::Validate};
use fuel_report_bot::{
    BotConfig, BotError, CliConfig, Dispatcher, DocxReportPipeline, LibreOfficeConverter,
    LocalStorage, ReportEngine, TelegramClient,
};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Before clap, so `.env` values reach its `env = ...` fallbacks.
    let env_file = load_env_file(None);
    let cli = CliConfig::parse();

    let config = match BotConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            fail(&e);
        }
    };

    logger::init_logger(config.verbose, config.json_logs);
    tracing::info!("Starting fuel-report-bot");
    match env_file {
        Ok(Some(path)) => tracing::info!(path = %path.display(), "loaded environment file"),
        Ok(None) => {}
        Err(e) => tracing::warn!("{}", e),
    }
    tracing::debug!("config: {:?}", config);

    if cli.check {
        match preflight(&config).await {
            Ok(()) => {
                println!("✅ office engine and templates are ready");
                return;
            }
            Err(e) => fail(&e),
        }
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = run(config).await {
        fail(&e);
    }
}

async fn run(config: BotConfig) -> fuel_report_bot::Result<()> {
    let api = Arc::new(TelegramClient::new(&config.api_base, &config.token)?);
    let storage = LocalStorage::new(config.templates_dir.clone());
    let converter = LibreOfficeConverter::from_config(&config);
    let settings = config.dispatcher_settings();
    let monitor = config.monitor;

    let pipeline = DocxReportPipeline::new(storage, converter, config);
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor);
    let dispatcher = Dispatcher::new(api, engine, settings);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("shutdown requested, finishing in-flight work");
        let _ = shutdown_tx.send(true);
    });

    dispatcher.run(shutdown_rx).await?;
    tracing::info!("✅ bot stopped");
    Ok(())
}

/// Checks that the converter starts and both templates are present.
async fn preflight(config: &BotConfig) -> fuel_report_bot::Result<()> {
    config.validate_runtime()?;

    let converter = LibreOfficeConverter::from_config(config);
    let version = converter.check_version().await?;
    tracing::info!(program = converter.program(), "office engine: {}", version);

    for family in [FuelFamily::Mdo, FuelFamily::Hfo] {
        let path = config.template_path(family);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BotError::TemplateError {
                message: format!("{} template missing at {}", family, path.display()),
            });
        }
        tracing::info!(template = %path.display(), "{} template found", family);
    }
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn fail(e: &BotError) -> ! {
    tracing::error!(
        "❌ fuel-report-bot failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
