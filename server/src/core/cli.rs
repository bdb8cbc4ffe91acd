use clap::Parser;

use std::path::PathBuf;

use super::constants::{ENV_AUTH_ENABLED, ENV_DATA_DIR, ENV_HOST, ENV_JWT_SECRET, ENV_PORT};

#[derive(Parser)]
#[command(name = "hymnal")]
#[command(version, about = "Hymn catalog server", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Disable authentication (for development)
    #[arg(long)]
    pub no_auth: bool,

    /// Enable or disable authentication
    #[arg(long, env = ENV_AUTH_ENABLED)]
    pub auth: Option<bool>,

    /// Data directory override
    #[arg(long, env = ENV_DATA_DIR)]
    pub data_dir: Option<PathBuf>,

    /// JWT signing secret (random per process when unset)
    #[arg(long, env = ENV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: Option<String>,
}

/// Resolved CLI configuration
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub auth_enabled: Option<bool>,
    pub data_dir: Option<PathBuf>,
    pub jwt_secret: Option<String>,
}

/// Parse command line arguments into a config overlay
pub fn parse() -> CliConfig {
    let cli = Cli::parse();

    let auth_enabled = if cli.no_auth { Some(false) } else { cli.auth };

    CliConfig {
        host: cli.host,
        port: cli.port,
        auth_enabled,
        data_dir: cli.data_dir,
        jwt_secret: cli.jwt_secret,
    }
}
