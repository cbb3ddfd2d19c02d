use clap::Parser;
use comexstat_agg::config::cli::{execute, exit_code, success_envelope, Cli};
use comexstat_agg::utils::logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting comexstat CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let engine = match cli.load_config().and_then(|config| config.build_engine()) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(&e));
        }
    };

    match execute(&engine, &cli.command).await {
        Ok(data) => {
            let output = serde_json::to_string_pretty(&success_envelope(data))?;
            println!("{}", output);
        }
        Err(e) => {
            tracing::error!(
                "❌ Query failed: {} (Category: {:?}, Status: {})",
                e,
                e.category(),
                e.status_code()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    }

    Ok(())
}
