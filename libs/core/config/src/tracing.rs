use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Default directives per environment when `RUST_LOG` is unset.
///
/// The search path logs one line per request at info; the domain and
/// database crates get more detail outside production.
pub fn default_filter(environment: &Environment) -> &'static str {
    if environment.is_production() {
        "info,domain_images=info,database=info,sea_orm=warn,sqlx=warn,tonic=warn,h2=warn,tower_http=info"
    } else {
        "debug,domain_images=debug,database=debug,sea_orm=info,sqlx=warn,tonic=info,h2=info,hyper=info,tower=info"
    }
}

/// Install the color-eyre report hook. Repeated calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Set up the global subscriber for the given environment.
///
/// Production emits flattened JSON events; everything else gets the pretty
/// formatter. Both carry an `ErrorLayer` so eyre reports include span traces.
/// `RUST_LOG` replaces [`default_filter`] entirely.
///
/// A second call leaves the first subscriber in place, which keeps test
/// binaries that initialize per test working.
pub fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(environment)));

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(()) => info!(?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized"),
    }
}
