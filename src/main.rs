use anomaly_lab::cli::{cmd_all, cmd_blobs_iforest, cmd_blobs_kde, cmd_blobs_ocsvm, cmd_digits, Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anomaly_lab=info")),
        )
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.out_dir)?;

    match cli.command {
        Some(Commands::BlobsKde) => cmd_blobs_kde(&cli.out_dir, cli.seed)?,
        Some(Commands::BlobsOcsvm) => cmd_blobs_ocsvm(&cli.out_dir, cli.seed)?,
        Some(Commands::BlobsIforest) => cmd_blobs_iforest(&cli.out_dir, cli.seed)?,
        Some(Commands::Digits) => cmd_digits(&cli.out_dir, cli.seed)?,
        None => cmd_all(&cli.out_dir, cli.seed)?,
    }

    Ok(())
}
