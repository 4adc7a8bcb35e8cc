use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use permit_harvester::config::Config;
use permit_harvester::utils::http::{create_client, RetryPolicy};
use permit_harvester::{geocode, output, pipeline, push};

#[derive(Debug, Parser)]
#[command(name = "permit-harvester")]
#[command(about = "Ingest, normalize and export municipal permit listings")]
struct Cli {
    /// Path to the YAML run configuration.
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("permit_harvester=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    info!(
        "Loaded {} sources, days_back={}",
        config.sources.len(),
        config.days_back
    );

    let client = create_client()?;
    let (records, reports) = pipeline::run_sources(&client, &config, RetryPolicy::default()).await;

    if config.geocode.enabled {
        for record in &records {
            let geo = geocode::geocode_address(record);
            debug!("Geocoded (stub): {}", geo.full_address);
        }
    }

    // File outputs are written before any push, so a push failure never
    // affects them.
    output::write_csv(config.output_csv.as_ref(), &records)?;
    info!("Wrote {} permits to {}", records.len(), config.output_csv);
    output::write_payload(config.airtable.payload_path.as_ref(), &records)?;

    if config.airtable.enabled {
        if let Err(e) = push::push_records(&client, &config.airtable, &records).await {
            error!("Webhook push failed: {:#}", e);
        }
    }

    for report in &reports {
        let status = if report.failed { " (failed)" } else { "" };
        println!("[{}] {} records{}", report.name, report.count, status);
    }
    println!("Total: {} records after dedup", records.len());

    Ok(())
}
