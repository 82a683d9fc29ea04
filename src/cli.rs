// CLI module - flag overrides on top of env/file configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, VERSION};

/// Sniffing reverse proxy: forwards all traffic to one upstream target,
/// logging every exchange and optionally keeping the bones.
#[derive(Parser, Debug, Default)]
#[command(name = "bloodhound")]
#[command(version = VERSION)]
#[command(about = "Sniffing reverse proxy", long_about = None)]
pub struct Cli {
    /// Address to listen on (overrides BLOODHOUND_LISTEN)
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Upstream base URL to forward to (overrides BLOODHOUND_TARGET)
    #[arg(long)]
    pub target: Option<String>,

    /// Directory to write request/response bones to (overrides BLOODHOUND_BONES)
    #[arg(long)]
    pub bones: Option<PathBuf>,
}

impl Cli {
    /// Apply flag overrides to an already-loaded configuration.
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(target) = self.target {
            config.target_url = target;
        }
        if let Some(bones) = self.bones {
            config.bone_dir = Some(bones);
        }
        config
    }
}
