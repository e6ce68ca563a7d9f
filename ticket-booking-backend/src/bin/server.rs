use ticket_booking_backend::error::AppError;
use ticket_booking_backend::run_server;
use ticket_booking_config::get_config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

fn setup_tracing() {
    const DEFAULT_LOG_LEVEL: &str = "info,ticket_booking_backend=debug,ticket_booking_store=debug,\
                                     hyper=info,tower_http=debug";

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer().with_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
            ),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_tracing();

    let config = get_config()?;
    let site = ticket_booking_store::connect(&config.store)?;
    run_server(site, config).await
}
