use bindery::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, ConfigObject)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub label: Option<String>,
}

impl Endpoint {
    fn local(port: u16, label: &str) -> Self {
        Self { host: "127.0.0.1".into(), port, label: Some(label.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ConfigEnum)]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
}

impl GameMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "survival" => Some(Self::Survival),
            "creative" => Some(Self::Creative),
            "adventure" => Some(Self::Adventure),
            _ => None,
        }
    }
}

fn at_most_hundred(players: u32) -> u32 {
    players.min(100)
}

#[interface(name = "server", comment = "Demo server settings")]
pub trait ServerConfig {
    #[config(default = 25565, comment = "Port the server listens on")]
    fn port(&self) -> Result<u16>;
    fn set_port(&self, port: u16) -> Result<()>;

    #[config(default = "&6Welcome to the demo", comment = "Message of the day")]
    fn motd(&self) -> Result<String>;

    #[config(default = 20, post = at_most_hundred, comment = "Capped at 100")]
    fn max_players(&self) -> Result<u32>;

    #[config(default = GameMode::Survival)]
    fn get_mode(&self) -> Result<GameMode>;
    fn set_mode(&self, mode: GameMode) -> Result<()>;

    #[config(
        default = vec![Endpoint::local(25575, "rcon"), Endpoint::local(25580, "query")],
        path = "network.endpoints"
    )]
    fn endpoints(&self) -> Result<Vec<Endpoint>>;

    #[config(default = vec!["admin".to_owned()])]
    fn operators(&self) -> Result<Vec<String>>;

    fn owner(&self) -> Result<Option<Uuid>>;
    fn set_owner(&self, owner: Option<Uuid>) -> Result<()>;
}
