//! `memkv-server` binary: parse arguments, build the store, serve HTTP.

use clap::Parser;
use memkv_server::network::{termination_signal, NetworkModule};
use memkv_server::{logging, ServerArgs};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    logging::init(args.log_format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "memkv-server starting");

    let store = args.store_config().build()?;
    let mut module = NetworkModule::new(args.network_config(), store);
    let port = module.start().await?;
    info!(port, backend = ?args.backend, "listening");

    module.serve(termination_signal()).await?;
    info!("memkv-server stopped");
    Ok(())
}
