use anyhow::{Context, Result};
use clap::Args;
use padlink_bus::BackendKind;
use padlink_gamepad::TargetOptions;
use padlink_protocol::TargetType;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

pub const DEFAULT_LISTEN: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 80);

/// Bridge settings. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub listen: SocketAddr,
    /// Pad kind created for each client.
    pub pad: TargetType,
    pub backend: BackendKind,
    #[serde(flatten)]
    pub ids: TargetOptions,
    /// Explicit path to the ViGEm client library.
    pub vigem_library: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN,
            pad: TargetType::Xbox360Wired,
            backend: BackendKind::default(),
            ids: TargetOptions::default(),
            vigem_library: None,
        }
    }
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PadKind {
    X360,
    Ds4,
}

impl From<PadKind> for TargetType {
    fn from(kind: PadKind) -> Self {
        match kind {
            PadKind::X360 => TargetType::Xbox360Wired,
            PadKind::Ds4 => TargetType::DualShock4Wired,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendArg {
    Vigem,
    Mock,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Vigem => BackendKind::Vigem,
            BackendArg::Mock => BackendKind::Mock,
        }
    }
}

/// `0x045E` or `1118`.
pub fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("{s:?}: {e}"))
}

/// Command-line values that win over the config file.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Address to listen on.
    #[arg(long)]
    pub listen: Option<SocketAddr>,
    /// Port to listen on, keeping the configured address.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
    #[arg(long, value_enum)]
    pub pad: Option<PadKind>,
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
    #[arg(long, value_parser = parse_u16)]
    pub vendor_id: Option<u16>,
    #[arg(long, value_parser = parse_u16)]
    pub product_id: Option<u16>,
    /// Path to ViGEmClient.dll.
    #[arg(long)]
    pub library: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(port) = self.port {
            config.listen.set_port(port);
        }
        if let Some(pad) = self.pad {
            config.pad = pad.into();
        }
        if let Some(backend) = self.backend {
            config.backend = backend.into();
        }
        if self.vendor_id.is_some() {
            config.ids.vendor_id = self.vendor_id;
        }
        if self.product_id.is_some() {
            config.ids.product_id = self.product_id;
        }
        if let Some(library) = &self.library {
            config.vigem_library = Some(library.clone());
        }
    }
}
