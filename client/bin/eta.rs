use anyhow::Result;
use clap::{Arg, Command};
use ridematch::{
    constants::MAX_ROUTE_DEVIATION_RATIO,
    services::{eta_with_fallback, DirectionsClient, DirectionsProvider},
    utils::{
        geo::{haversine_km, is_point_on_route, route_metrics, Coordinate},
        init_logging,
    },
};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    dotenvy::dotenv().ok();

    let matches = Command::new("eta")
        .about("Estimate driving time between two points")
        .arg(Arg::new("from-lat").long("from-lat").required(true).allow_negative_numbers(true))
        .arg(Arg::new("from-lng").long("from-lng").required(true).allow_negative_numbers(true))
        .arg(Arg::new("to-lat").long("to-lat").required(true).allow_negative_numbers(true))
        .arg(Arg::new("to-lng").long("to-lng").required(true).allow_negative_numbers(true))
        .arg(
            Arg::new("via-lat")
                .long("via-lat")
                .help("Check whether this point lies on the route")
                .allow_negative_numbers(true)
                .requires("via-lng"),
        )
        .arg(
            Arg::new("via-lng")
                .long("via-lng")
                .allow_negative_numbers(true)
                .requires("via-lat"),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .help("Skip the directions API and use the haversine estimate")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let value = |name: &str| -> Result<f64> {
        let raw = matches
            .get_one::<String>(name)
            .ok_or_else(|| anyhow::anyhow!("--{} is required", name))?;
        raw.parse()
            .map_err(|e| anyhow::anyhow!("Invalid --{} '{}': {}", name, raw, e))
    };

    let from = Coordinate::new(value("from-lat")?, value("from-lng")?)?;
    let to = Coordinate::new(value("to-lat")?, value("to-lng")?)?;

    let directions = match env::var("DIRECTIONS_API_KEY") {
        Ok(key) if !key.is_empty() && !matches.get_flag("offline") => Some(DirectionsClient::new(key)?),
        _ => None,
    };

    info!("📏 Straight-line distance: {:.2} km", haversine_km(from, to));

    let eta = eta_with_fallback(
        directions.as_ref().map(|d| d as &dyn DirectionsProvider),
        from,
        to,
    )
    .await;

    println!("{} ({:?})", eta.text, eta.source);

    if matches.contains_id("via-lat") {
        let via = Coordinate::new(value("via-lat")?, value("via-lng")?)?;
        let metrics = route_metrics(from, to, via);
        let on_route = is_point_on_route(from, to, via, MAX_ROUTE_DEVIATION_RATIO);

        info!(
            "🧭 Via point: {:.2} km off the route, {:.2} km along {:.2} km",
            metrics.cross_track_km, metrics.along_track_km, metrics.route_km
        );
        println!("On route: {}", if on_route { "yes" } else { "no" });
    }

    Ok(())
}
