use clap::{Parser, Subcommand};
use pdf_qa::Result;
use pdf_qa::commands::{ingest_folder, serve, show_config, show_status};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-qa")]
#[command(about = "Retrieval-augmented question answering over PDF documents")]
#[command(version)]
struct Cli {
    /// Base directory for configuration, documents, and the vector index
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (ingests pre-existing PDFs at startup)
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Rebuild the vector index from the documents folder
    Ingest,
    /// Show documents folder and vector index state
    Status,
    /// Show the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            serve(cli.base_dir, port).await?;
        }
        Commands::Ingest => {
            ingest_folder(cli.base_dir).await?;
        }
        Commands::Status => {
            show_status(cli.base_dir).await?;
        }
        Commands::Config => {
            show_config(cli.base_dir)?;
        }
    }

    Ok(())
}
