use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    #[value(name = "fetch-offline")]
    FetchOffline,
    Fetch,
    Disks,
    Files,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::FetchOffline => "fetch-offline",
            Stage::Fetch => "fetch",
            Stage::Disks => "disks",
            Stage::Files => "files",
        })
    }
}

/// Command-line surface of the engine (§6). One binary, one stage per
/// invocation; the orchestrating shell script (outside this crate's scope)
/// runs all four in order.
#[derive(Debug, Parser)]
#[command(name = "ignition", version, about = "First-boot machine provisioning engine")]
pub struct Cli {
    /// Which stage to run.
    #[arg(long, value_enum)]
    pub stage: Stage,

    /// Stage-root for file operations.
    #[arg(long, default_value = "/sysroot")]
    pub root: PathBuf,

    /// Path to the cached effective config.
    #[arg(long = "config-cache", default_value = "/run/ignition.json")]
    pub config_cache: PathBuf,

    /// OEM provider identifier; if omitted, read from the kernel cmdline.
    #[arg(long)]
    pub platform: Option<String>,

    /// Delete the cache on entry before doing anything else.
    #[arg(long = "clear-cache")]
    pub clear_cache: bool,

    /// Logging verbosity [off, error, warn, info, debug, trace]
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,
}
