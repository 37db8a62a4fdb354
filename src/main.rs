mod analysis;
mod app;
mod commands;
mod config;
mod logging;
mod spectrogram;
mod ui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
