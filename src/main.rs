mod api;
mod app;
mod application;
mod config;
mod domain;
mod platform;
mod ui;
mod utils;

use iced::window;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

fn main() -> iced::Result {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bookbuilder=debug")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration, using defaults");
            AppConfig::default()
        }
    };
    info!(
        base_url = %config.api.base_url,
        download_dir = %config.download_dir.display(),
        streaming = config.streaming,
        "Starting Book Builder"
    );

    iced::application(
        move || app::BookBuilderApp::new(config.clone()),
        app::update,
        app::view,
    )
    .title("Book Builder")
    .subscription(app::subscription)
    .window(window::Settings {
        // Closing waits for queued downloads to finish.
        exit_on_close_request: false,
        ..Default::default()
    })
    .run()
}
