#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rx_ledger::app::run().await
}
