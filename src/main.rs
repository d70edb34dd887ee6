use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tributary::app::AppContext;
use tributary::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.config.as_deref())?;

    match cli.command {
        Commands::Sites => {
            commands::list_sites(&ctx, cli.json)?;
        }
        Commands::Sections { site } => {
            commands::list_sections(&ctx, &site, cli.json)?;
        }
        Commands::Browse {
            site,
            section,
            page,
        } => {
            commands::browse(&ctx, &site, &section, page, cli.json).await?;
        }
        Commands::Search { site, query } => {
            commands::search(&ctx, &site, &query, cli.json).await?;
        }
        Commands::Show { site, url } => {
            commands::show(&ctx, &site, &url, cli.json).await?;
        }
        Commands::Links { site, url } => {
            commands::links(&ctx, &site, &url, cli.json).await?;
        }
    }

    Ok(())
}
