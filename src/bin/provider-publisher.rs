//! Provider Publisher CLI
//!
//! Publishes the release in `dist/` to the private provider registry.
//! Takes no arguments; everything is read from the environment.

use anyhow::Result;
use provider_publisher::{PublishConfig, PublishStage, exit_code, publish};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            println!("\n❌ Error");
            println!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let config = PublishConfig::from_env()?;

    println!("\n📦 provider-publisher\n");
    println!("  Provider: {}", config.provider_address());
    println!("  Registry: {}", config.api_url);
    println!("  Dist:     {}\n", config.dist_dir.display());

    let result = publish(&config).await;
    match &result {
        Ok(report) => {
            if report.dry_run {
                println!("\n✅ Dry run completed, nothing was published");
            } else {
                println!("\n✅ Publishing completed successfully!");
            }
            println!("{}", report.summary());
        }
        Err(failure) => {
            println!("\n❌ Publishing failed during {}", failure.stage);
            println!("  {}", failure.error);
            let actions = failure.error.suggested_actions();
            if !actions.is_empty() {
                println!("\n💡 Suggested actions:");
                for action in actions {
                    println!("  - {}", action);
                }
            }
            if !matches!(failure.stage, PublishStage::Initial | PublishStage::Scan) {
                println!("\n⚠️  Steps completed before the failure are not rolled back.");
            }
            tracing::debug!(history = %failure.history, "stage history");
        }
    }

    Ok(exit_code(&result))
}
