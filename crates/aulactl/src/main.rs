//! Aula Control - CLI front-end for the Aula student portal
//!
//! Loads config, sets up logging, opens the document store and runs one command.

use anyhow::{Context, Result};
use aula_common::{logging, AulaConfig};
use aulactl::{commands, Cli, Commands, Portal};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AulaConfig::load(cli.config.as_deref()).context("loading configuration")?;
    logging::init(&config.log.level);

    let portal = Portal::open(config).await?;
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Login => commands::login(&portal, user).await,
        Commands::Subjects => commands::subjects(&portal).await,
        Commands::Lessons { subject, search } => {
            commands::lessons(&portal, user, subject, search).await
        }
        Commands::Complete { lesson } => commands::complete(&portal, user, &lesson).await,
        Commands::Rename { name } => commands::rename(&portal, user, &name).await,
        Commands::Color { tag } => commands::color(&portal, user, &tag).await,
        Commands::Ranking { limit } => commands::ranking(&portal, limit).await,
        Commands::Visibility { state } => commands::visibility(&portal, user, state).await,
        Commands::Levels { subject } => commands::levels(&portal, user, &subject).await,
        Commands::Play { subject, level } => commands::play(&portal, user, &subject, level).await,
        Commands::Library { subject } => commands::library(&portal, subject).await,
        Commands::Admin { action } => commands::admin(&portal, action).await,
    }
}
