use phytopulse_server_lib::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    phytopulse_server_lib::run(config).await
}
