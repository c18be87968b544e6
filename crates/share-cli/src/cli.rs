use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shares",
    about = "Share ledger: issue, transfer, and retire shares",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// World-state log file
    #[arg(long, global = true, default_value = ".shares/world.state")]
    pub state: PathBuf,

    /// Ledger policy file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write the five seed shares
    Init,
    /// Issue a new share to the issuer
    Create(IdArgs),
    /// Show a share
    Read(IdArgs),
    /// Check whether a share exists
    Exists(IdArgs),
    /// Move a share to a new owner
    Transfer(TransferArgs),
    /// Retire an issuer-owned share
    Delete(IdArgs),
    /// List every share
    List,
    /// Call a ledger function by name
    Invoke(InvokeArgs),
    /// Rewrite the state log with live records only
    Compact,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct TransferArgs {
    pub id: String,
    pub new_owner: String,
}

#[derive(Args)]
pub struct InvokeArgs {
    pub function: String,
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["shares", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init));
        assert_eq!(cli.state, PathBuf::from(".shares/world.state"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_create() {
        let cli = Cli::try_parse_from(["shares", "create", "10"]).unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.id, "10");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_transfer() {
        let cli = Cli::try_parse_from(["shares", "transfer", "0", "CEO"]).unwrap();
        if let Command::Transfer(args) = cli.command {
            assert_eq!(args.id, "0");
            assert_eq!(args.new_owner, "CEO");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_transfer_missing_owner() {
        assert!(Cli::try_parse_from(["shares", "transfer", "0"]).is_err());
    }

    #[test]
    fn parse_invoke_with_args() {
        let cli = Cli::try_parse_from(["shares", "invoke", "TransferShare", "3", "Enterprise"]).unwrap();
        if let Command::Invoke(args) = cli.command {
            assert_eq!(args.function, "TransferShare");
            assert_eq!(args.args, vec!["3", "Enterprise"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_invoke_without_args() {
        let cli = Cli::try_parse_from(["shares", "invoke", "GetAllShares"]).unwrap();
        if let Command::Invoke(args) = cli.command {
            assert!(args.args.is_empty());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_paths() {
        let cli = Cli::try_parse_from([
            "shares", "list", "--state", "/tmp/w.state", "--config", "ledger.toml",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::List));
        assert_eq!(cli.state, PathBuf::from("/tmp/w.state"));
        assert_eq!(cli.config, Some(PathBuf::from("ledger.toml")));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["shares", "-v", "compact"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Compact));
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["shares", "--format", "json", "read", "0"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
