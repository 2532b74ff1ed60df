use clap::Parser;
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use vmscale_cli::VmScaleCli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_log();
    let cli = VmScaleCli::parse();
    if let Err(e) = vmscale_cli::run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_log() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("VMSCALE_LOG")
                .from_env_lossy(),
        )
        .init();
}
