mod cli;
mod config_resolve;
mod error;
mod fetch;
mod logging;
mod providers;
mod stages;

use clap::Parser;
use log::error;

use cli::{Cli, Stage};
use error::IgnitionError;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbosity);

    let result = match cli.stage {
        Stage::FetchOffline => stages::fetch_offline::execute(&cli),
        Stage::Fetch => stages::fetch::execute(&cli),
        Stage::Disks => stages::disks::execute(&cli),
        Stage::Files => stages::files::execute(&cli),
    };

    if let Err(err) = result {
        report_and_exit(&cli, err);
    }
}

/// Logs the failure as a single multi-line block (kind, implicated config
/// path, subprocess stderr when present) and exits with the code §7
/// assigns to that error kind.
fn report_and_exit(cli: &Cli, err: IgnitionError) -> ! {
    let code = err.exit_code();
    error!(
        "ignition: stage '{}' failed (exit {code})\n  config: {}\n  error: {err:#}",
        cli.stage,
        cli.config_cache.display(),
    );
    std::process::exit(code);
}
