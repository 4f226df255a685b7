mod args;
mod server;

use crate::args::{Cli, Command};
use crate::server::{BoundServerConfig, GameMode, ServerConfig};
use anyhow::{Context, bail};
use bindery::{Bindery, BinderySettings, ConfigInterface};
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let mut settings = BinderySettings::load(cli.settings.as_ref())
        .context("Critical: Settings are malformed")?;
    if let Some(directory) = cli.directory {
        settings.directory = directory;
    }

    let bindery = Bindery::builder().settings(&settings).build()?;
    let server = bindery.init::<BoundServerConfig>()?;

    match cli.command.unwrap_or(Command::Show) {
        Command::Show => {}
        Command::SetPort { port } => server.set_port(port)?,
        Command::SetMode { mode } => {
            let Some(mode) = GameMode::parse(&mode) else {
                bail!("Unknown game mode `{mode}`; expected survival, creative or adventure");
            };
            server.set_mode(mode)?;
        }
        Command::Claim { clear } => server.set_owner((!clear).then(Uuid::new_v4))?,
        Command::Reload => server.handle().reload()?,
    }

    show(&server)
}

fn init_logging(directives: Option<&str>) -> anyhow::Result<()> {
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_ansi(true))
        .try_init()
        .context("Failed to install the tracing subscriber")
}

fn show(server: &BoundServerConfig) -> anyhow::Result<()> {
    info!(port = server.port()?, motd = %server.motd()?, "Listening");
    info!(max_players = server.max_players()?, mode = ?server.get_mode()?, "Gameplay");
    for endpoint in server.endpoints()? {
        info!(host = %endpoint.host, port = endpoint.port, label = ?endpoint.label, "Endpoint");
    }
    info!(operators = ?server.operators()?, owner = ?server.owner()?, "Access");
    Ok(())
}
