mod commands;

use std::path::PathBuf;

use clap::Parser;
use slova_core::Config;

use crate::commands::Command;

/// Romanian corpus preparation: document triage, cleanup, tokenizer
/// training and sequence packing.
#[derive(Parser, Debug)]
#[command(name = "slova", version, about)]
struct Cli {
    /// Pipeline configuration (TOML). Missing files fall back to defaults.
    #[arg(
        long,
        global = true,
        env = "SLOVA_CONFIG",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config = Config::load(&cli.config)?;
    config.validate()?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    cli.command.run(&config).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unite_takes_inputs_and_output() {
        let cli = Cli::try_parse_from([
            "slova", "unite", "--output", "all.jsonl", "--clean", "a.jsonl", "b.txt",
        ])
        .unwrap();
        let Command::Unite(args) = cli.command else {
            panic!("expected unite");
        };
        assert_eq!(args.output, PathBuf::from("all.jsonl"));
        assert!(args.clean);
        assert_eq!(args.inputs.len(), 2);
    }

    #[test]
    fn unite_requires_an_input() {
        assert!(Cli::try_parse_from(["slova", "unite", "--output", "x.jsonl"]).is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["slova", "models", "--split", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(matches!(cli.command, Command::Models(ref m) if m.split));
    }
}
