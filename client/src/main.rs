use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Arg, ArgMatches, Command};
use ridematch::{
    matching::{RideMatchController, RideMatchState},
    models::{Location, RideRequest, RideType},
    services::{eta_with_fallback, DirectionsClient, DirectionsProvider, HttpRideBackend, RideBackend, Session},
    utils::{config::parse_max_attempts, init_logging, Config},
};
use std::sync::Arc;
use tracing::{error, info, warn};

fn cli() -> Command {
    Command::new("ride_matcher")
        .about("Submit a ride and wait for the backend to match it")
        .arg(
            Arg::new("type")
                .long("type")
                .help("offer (driver), request (passenger) or parcel")
                .default_value("request"),
        )
        .arg(Arg::new("pickup-lat").long("pickup-lat").required(true).allow_negative_numbers(true))
        .arg(Arg::new("pickup-lng").long("pickup-lng").required(true).allow_negative_numbers(true))
        .arg(Arg::new("pickup-name").long("pickup-name").default_value("Pickup"))
        .arg(Arg::new("dropoff-lat").long("dropoff-lat").required(true).allow_negative_numbers(true))
        .arg(Arg::new("dropoff-lng").long("dropoff-lng").required(true).allow_negative_numbers(true))
        .arg(Arg::new("dropoff-name").long("dropoff-name").default_value("Dropoff"))
        .arg(
            Arg::new("departure")
                .long("departure")
                .help("RFC 3339 departure time; defaults to now"),
        )
        .arg(
            Arg::new("max-attempts")
                .long("max-attempts")
                .help("Override MATCH_MAX_ATTEMPTS"),
        )
}

fn coordinate_arg(matches: &ArgMatches, name: &str) -> Result<f64> {
    let raw = matches
        .get_one::<String>(name)
        .ok_or_else(|| anyhow::anyhow!("--{} is required", name))?;
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid --{} '{}': {}", name, raw, e))
}

fn request_from_args(matches: &ArgMatches) -> Result<RideRequest> {
    let ride_type: RideType = matches
        .get_one::<String>("type")
        .map(String::as_str)
        .unwrap_or("request")
        .parse()?;

    let pickup = Location::new(
        coordinate_arg(matches, "pickup-lat")?,
        coordinate_arg(matches, "pickup-lng")?,
        matches.get_one::<String>("pickup-name").cloned().unwrap_or_default(),
    );
    let dropoff = Location::new(
        coordinate_arg(matches, "dropoff-lat")?,
        coordinate_arg(matches, "dropoff-lng")?,
        matches.get_one::<String>("dropoff-name").cloned().unwrap_or_default(),
    );

    // Reject bad coordinates before anything reaches the backend
    pickup.coordinate()?;
    dropoff.coordinate()?;

    let mut request = RideRequest::new(ride_type, pickup, dropoff);
    if let Some(raw) = matches.get_one::<String>("departure") {
        let departure: DateTime<Utc> = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| anyhow::anyhow!("Invalid --departure '{}': {}", raw, e))?
            .with_timezone(&Utc);
        request = request.departing_at(departure);
    }

    Ok(request)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let matches = cli().get_matches();
    let config = Config::from_env()?;
    let request = request_from_args(&matches)?;

    let mut settings = config.poll_settings();
    if let Some(raw) = matches.get_one::<String>("max-attempts") {
        settings.max_attempts = parse_max_attempts("--max-attempts", raw)?;
    }

    info!("🎯 Starting ride matcher against {}", config.api_url);

    // Trip estimate, as shown before confirming a route
    let directions = match &config.directions_api_key {
        Some(key) => Some(DirectionsClient::new(key.clone())?),
        None => None,
    };
    let trip_eta = eta_with_fallback(
        directions.as_ref().map(|d| d as &dyn DirectionsProvider),
        request.pickup.coordinate()?,
        request.dropoff.coordinate()?,
    )
    .await;
    info!("🗺️ Estimated drive: {} ({:?})", trip_eta.text, trip_eta.source);

    let session = Session::from_config(&config);
    let backend: Arc<dyn RideBackend> =
        Arc::new(HttpRideBackend::new(&config.api_url, session, config.http_timeout())?);

    let mut controller = RideMatchController::new(backend, request, settings);

    let outcome = tokio::select! {
        state = controller.run() => Some(state),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(state) = outcome else {
        warn!("Interrupted while searching (policy: {})", settings.abandon_policy);
        controller.dispose().await;
        return Ok(());
    };
    controller.dispose().await;

    match state {
        RideMatchState::Matched(outcome) => {
            let contact = outcome.contact();
            println!("Matched with {} (ride {})", contact.name, contact.ride_id);
            if let Some(phone) = &contact.phone {
                println!("Phone: {}", phone);
            }
            if let Some(name) = &outcome.matched.pickup.name {
                println!("Their pickup: {}", name);
            }
            match &outcome.eta {
                Some(eta) => println!("ETA: {}", eta.text),
                None => println!("ETA: unknown"),
            }
        }
        RideMatchState::Saved { ride_id, message } => {
            println!("Ride {}: {}", ride_id, message);
        }
        RideMatchState::Failed(e) => {
            error!("Ride matching failed: {}", e);
            return Err(e.into());
        }
        other => {
            warn!("Ride matcher stopped in state {}", other.label());
        }
    }

    Ok(())
}
