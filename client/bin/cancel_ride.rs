use anyhow::Result;
use clap::{Arg, Command};
use ridematch::{
    models::RideId,
    services::{HttpRideBackend, RideBackend, Session},
    utils::{init_logging, Config},
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let matches = Command::new("cancel_ride")
        .about("Delete a ride that should no longer be matched")
        .arg(
            Arg::new("ride-id")
                .long("ride-id")
                .required(true)
                .help("Backend id of the ride to delete"),
        )
        .arg(
            Arg::new("confirm")
                .long("confirm")
                .help("Confirm the deletion (required)")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let raw_id = matches
        .get_one::<String>("ride-id")
        .ok_or_else(|| anyhow::anyhow!("--ride-id is required"))?;
    let ride_id = RideId(
        raw_id
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid --ride-id '{}': {}", raw_id, e))?,
    );

    if !matches.get_flag("confirm") {
        warn!("⚠️  Deletion not confirmed. Use --confirm to delete ride {}.", ride_id);
        return Ok(());
    }

    let config = Config::from_env()?;
    let backend = HttpRideBackend::new(
        &config.api_url,
        Session::from_config(&config),
        config.http_timeout(),
    )?;

    info!("🔄 Deleting ride {}...", ride_id);
    match backend.delete_ride(ride_id).await {
        Ok(()) => {
            info!("✅ Ride {} deleted", ride_id);
            Ok(())
        }
        Err(e) => {
            error!("❌ Failed to delete ride {}: {}", ride_id, e);
            Err(e.into())
        }
    }
}
