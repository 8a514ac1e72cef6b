use blaze_ingest::config::robots_base_url;
use blaze_ingest::utils::error::ErrorSeverity;
use blaze_ingest::utils::{logger, validation::Validate};
use blaze_ingest::{
    AdapterCore, AdapterError, AdapterRunner, CliConfig, EspnAdapter, LocalStorage,
    MlbStatsAdapter, SourceAdapter, SourceKind, TomlConfig,
};
use clap::Parser;

async fn run_adapter<A: SourceAdapter>(adapter: A) -> blaze_ingest::Result<()> {
    let mut runner = AdapterRunner::new(adapter);
    let report = runner.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run(cli: &CliConfig, config: TomlConfig) -> blaze_ingest::Result<()> {
    if cli.robots_only {
        let base_url = robots_base_url(&config, cli.source)?;
        let core = AdapterCore::new("robots-check", config.adapter.clone())?;
        let decision = core.check_robots_txt(base_url).await;
        println!("{} -> {:?}", base_url, decision);
        return Ok(());
    }

    let storage = LocalStorage::new(config.output.path.clone());
    match cli.source {
        SourceKind::Mlb => {
            run_adapter(MlbStatsAdapter::new(config.adapter, config.mlb, storage)?).await
        }
        SourceKind::Espn => {
            run_adapter(EspnAdapter::new(config.adapter, config.espn, storage)?).await
        }
    }
}

fn exit_with(e: &AdapterError) -> ! {
    tracing::error!("❌ Ingestion failed: {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e);
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 4,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting blaze-ingest for {:?}", cli.source);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = cli.validate() {
        exit_with(&e);
    }
    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    if let Err(e) = run(&cli, config).await {
        exit_with(&e);
    }

    tracing::info!("✅ Ingestion completed successfully!");
    Ok(())
}
