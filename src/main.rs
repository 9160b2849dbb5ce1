mod app;
mod config;
mod error;
mod ledger;
mod responder;
mod rules;
mod types;
mod widget;

use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("support_chat_server=info,tower_http=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = app::run().await {
        tracing::error!(error = %err, "support chat server failed");
        std::process::exit(1);
    }
}
