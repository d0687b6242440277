pub mod config;
pub mod geo;
pub mod logging;

pub use config::Config;
pub use logging::init_logging;
