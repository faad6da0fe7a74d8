// File: src/bin/tui.rs
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    duedeck::tui::run().await
}
