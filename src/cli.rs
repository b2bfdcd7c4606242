use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Keeps a reality-competition pool's season snapshot current.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    /// Season TOML, overriding `SEASON_FILE`
    #[arg(long)]
    pub season: Option<PathBuf>,

    /// Snapshot JSON path, overriding `SNAPSHOT_PATH`
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scrape the configured sources and save the result (default)
    Scrape,
    /// Save a hand-written snapshot in place of scraped data
    Override {
        /// JSON file holding the snapshot to persist
        file: PathBuf,
    },
    /// Print the persisted snapshot
    Show,
    /// Serve the persisted snapshot over HTTP
    Serve {
        /// Port to listen on, overriding `PORT`
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable output for terminals
    Pretty,
    /// One JSON object per line
    Json,
}

fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_is_the_default_command() {
        let args = Args::try_parse_from(["survivor-pool"]).unwrap();
        assert_eq!(args.command, None);
    }

    #[test]
    fn override_takes_a_file() {
        let args =
            Args::try_parse_from(["survivor-pool", "--tracing", "json", "override", "manual.json"])
                .unwrap();
        assert_eq!(args.tracing, TracingFormat::Json);
        assert_eq!(
            args.command,
            Some(Command::Override {
                file: PathBuf::from("manual.json")
            })
        );
    }

    #[test]
    fn serve_port() {
        let args = Args::try_parse_from(["survivor-pool", "serve", "--port", "9000"]).unwrap();
        assert_eq!(args.command, Some(Command::Serve { port: Some(9000) }));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
