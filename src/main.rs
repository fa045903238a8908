use clap::Parser;
use smartpost_client::config::ShipmentFile;
use smartpost_client::utils::error::ErrorSeverity;
use smartpost_client::utils::{logger, validation::Validate};
use smartpost_client::{
    CarrierClient, CliConfig, ClientConfig, Command, ShipmentRecord, ShippingError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting smartpost CLI");

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: CliConfig) -> Result<(), ShippingError> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }

    // 驗證配置
    config.validate()?;
    if cli.verbose {
        tracing::debug!("Client config: {:?}", config);
    }

    let mut client = CarrierClient::from_config(&config)?;

    match cli.command {
        Command::Ship { input } => {
            let file = ShipmentFile::from_file(&input)?;
            tracing::info!(
                "📦 Loaded {} shipment(s) from {}",
                file.shipments.len(),
                input.display()
            );
            for record in file.shipments {
                client.add_shipment(record);
            }
            let results = client.create_shipments().await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Track { barcodes } => {
            for barcode in barcodes {
                client.add_shipment(ShipmentRecord::tracked(barcode));
            }
            let results = client.track_shipments().await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Labels {
            barcodes,
            format,
            output,
        } => {
            let document = client.fetch_labels(barcodes.as_slice(), &format).await?;
            std::fs::write(&output, document.as_bytes())?;
            tracing::info!("📁 Labels saved to: {}", output.display());
            println!("✅ Labels saved to: {}", output.display());
        }
    }

    Ok(())
}
