use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use share_ledger::{Invocation, LedgerConfig, ShareLedger};
use share_store::{FileStateConfig, FileWorldState};
use share_types::{LedgerEntry, Share, ShareRecord};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ledger = open_ledger(&cli.state, cli.config.as_deref())?;
    let output = execute(&ledger, cli.command, &cli.format)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn open_ledger(state: &Path, config: Option<&Path>) -> anyhow::Result<ShareLedger<FileWorldState>> {
    let config = match config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    let world = FileWorldState::open(state, FileStateConfig::default())
        .with_context(|| format!("opening world state {}", state.display()))?;
    tracing::debug!(state = %state.display(), "world state opened");
    Ok(ShareLedger::with_config(world, config)?)
}

/// Run one command and render its output.
fn execute(
    ledger: &ShareLedger<FileWorldState>,
    command: Command,
    format: &OutputFormat,
) -> anyhow::Result<String> {
    let invocation = match command {
        Command::Compact => return cmd_compact(ledger, format),
        Command::Invoke(args) => {
            let invocation = Invocation::parse(&args.function, args.args.as_slice())?;
            let payload = ledger.invoke(&invocation)?;
            return Ok(match format {
                OutputFormat::Json => payload,
                OutputFormat::Text if payload.is_empty() => {
                    format!("{} {}", "✓".green().bold(), invocation.function_name())
                }
                OutputFormat::Text => payload,
            });
        }
        Command::Init => Invocation::InitLedger,
        Command::Create(args) => Invocation::CreateShare { id: args.id },
        Command::Read(args) => Invocation::ReadShare { id: args.id },
        Command::Exists(args) => Invocation::ShareExists { id: args.id },
        Command::Transfer(args) => Invocation::TransferShare {
            id: args.id,
            new_owner: args.new_owner,
        },
        Command::Delete(args) => Invocation::DeleteShare { id: args.id },
        Command::List => Invocation::GetAllShares,
    };

    let payload = ledger.invoke(&invocation)?;
    match format {
        OutputFormat::Json => Ok(payload),
        OutputFormat::Text => render_text(&invocation, &payload),
    }
}

fn render_text(invocation: &Invocation, payload: &str) -> anyhow::Result<String> {
    let text = match invocation {
        Invocation::InitLedger => {
            format!("{} Initialized ledger with seed shares", "✓".green().bold())
        }
        Invocation::CreateShare { id } => {
            let share = Share::from_slice(payload.as_bytes())?;
            format!(
                "{} Created share {} owned by {}",
                "✓".green().bold(),
                id.yellow(),
                share.owner.bold()
            )
        }
        Invocation::ReadShare { id } => match Share::from_slice(payload.as_bytes()) {
            Ok(share) => describe_share(&share),
            Err(_) => format!("{}  {}  {}", id.yellow(), payload, "(undecodable)".red()),
        },
        Invocation::ShareExists { id } => {
            if payload == "true" {
                format!("Share {} {}", id.yellow(), "exists".green())
            } else {
                format!("Share {} {}", id.yellow(), "does not exist".red())
            }
        }
        Invocation::TransferShare { id, new_owner } => format!(
            "{} Transferred share {} to {}",
            "✓".green().bold(),
            id.yellow(),
            new_owner.bold()
        ),
        Invocation::DeleteShare { id } => {
            format!("{} Deleted share {}", "✓".green().bold(), id.yellow())
        }
        Invocation::GetAllShares => {
            let entries: Vec<LedgerEntry> = serde_json::from_str(payload)?;
            list_entries(&entries)
        }
    };
    Ok(text)
}

fn describe_share(share: &Share) -> String {
    let history = if share.prev_owners.is_empty() {
        "(none)".dimmed().to_string()
    } else {
        share.prev_owners.join(" → ")
    };
    format!(
        "Share {}\n  Owner: {}\n  Price: {}\n  Previous owners: {}",
        share.id.yellow().bold(),
        share.owner.bold(),
        share.price,
        history
    )
}

fn list_entries(entries: &[LedgerEntry]) -> String {
    if entries.is_empty() {
        return "No shares.".to_string();
    }
    entries
        .iter()
        .map(|entry| match &entry.record {
            ShareRecord::Share(share) => format!(
                "{}  {}  {}  ({} transfers)",
                entry.key.yellow(),
                share.owner.bold(),
                share.price,
                share.transfer_count()
            ),
            ShareRecord::Raw(raw) => format!(
                "{}  {}  {}",
                entry.key.yellow(),
                raw,
                "(undecodable)".red()
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cmd_compact(ledger: &ShareLedger<FileWorldState>, format: &OutputFormat) -> anyhow::Result<String> {
    let state = ledger.state();
    let before = state.log_offset()?;
    state.compact()?;
    let after = state.log_offset()?;
    Ok(match format {
        OutputFormat::Json => serde_json::json!({
            "path": state.path().display().to_string(),
            "before": before,
            "after": after,
        })
        .to_string(),
        OutputFormat::Text => format!(
            "{} Compacted {} ({} → {} bytes)",
            "✓".green().bold(),
            state.path().display().to_string().bold(),
            before,
            after
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use share_store::WorldState;

    fn ledger_in(dir: &tempfile::TempDir) -> ShareLedger<FileWorldState> {
        open_ledger(&dir.path().join("world.state"), None).unwrap()
    }

    fn run(ledger: &ShareLedger<FileWorldState>, args: &[&str]) -> anyhow::Result<String> {
        let mut argv = vec!["shares"];
        argv.extend_from_slice(args);
        let cli = <Cli as clap::Parser>::try_parse_from(argv).unwrap();
        execute(ledger, cli.command, &cli.format)
    }

    #[test]
    fn init_then_list() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        run(&ledger, &["init"]).unwrap();
        let listing = run(&ledger, &["list"]).unwrap();
        assert_eq!(listing.lines().count(), 5);
        assert!(listing.lines().next().unwrap().starts_with("0  Enterprise  1000"));
    }

    #[test]
    fn json_read_prints_payload() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        run(&ledger, &["init"]).unwrap();
        run(&ledger, &["transfer", "0", "CEO"]).unwrap();
        let out = run(&ledger, &["--format", "json", "read", "0"]).unwrap();
        let share: Share = serde_json::from_str(&out).unwrap();
        assert_eq!(share.owner, "CEO");
        assert_eq!(share.prev_owners, vec!["Enterprise"]);
    }

    #[test]
    fn read_of_non_share_value_prints_raw_text() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.state().put_state("odd", b"{not a share").unwrap();

        let out = run(&ledger, &["read", "odd"]).unwrap();
        assert_eq!(out, "odd  {not a share  (undecodable)");
        let out = run(&ledger, &["--format", "json", "read", "odd"]).unwrap();
        assert_eq!(out, "{not a share");
    }

    #[test]
    fn delete_of_ceo_share_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        run(&ledger, &["init"]).unwrap();
        let err = run(&ledger, &["delete", "3"]).unwrap_err();
        assert!(err.to_string().contains("must be owned by Enterprise"));
    }

    #[test]
    fn invoke_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        run(&ledger, &["invoke", "InitLedger"]).unwrap();
        let out = run(&ledger, &["invoke", "ShareExists", "4"]).unwrap();
        assert_eq!(out, "true");
        assert!(run(&ledger, &["invoke", "MintShare"]).is_err());
    }

    #[test]
    fn compact_reports_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        run(&ledger, &["init"]).unwrap();
        run(&ledger, &["transfer", "1", "CEO"]).unwrap();
        let out = run(&ledger, &["--format", "json", "compact"]).unwrap();
        let report: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(report["after"].as_u64().unwrap() < report["before"].as_u64().unwrap());
        assert!(ledger.share_exists("1").unwrap());
    }

    #[test]
    fn config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("ledger.toml");
        std::fs::write(&config, LedgerConfig::strict().to_toml_string().unwrap()).unwrap();
        let ledger = open_ledger(&dir.path().join("world.state"), Some(&config)).unwrap();
        run(&ledger, &["create", "10"]).unwrap();
        assert!(run(&ledger, &["create", "10"]).is_err());
    }
}
