#[tokio::main]
async fn main() -> anyhow::Result<()> {
    marketpulse_lib::run().await
}
