//! Function-name dispatch for ledger-execution hosts.
//!
//! A host calls the ledger with a function name and a list of string
//! arguments, one call per transaction. [`Invocation::parse`] turns that pair
//! into a typed request and [`ShareLedger::invoke`] runs it, returning the
//! payload the host hands back to its client.

use share_store::WorldState;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::ShareLedger;

/// A parsed ledger call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    InitLedger,
    CreateShare { id: String },
    ReadShare { id: String },
    ShareExists { id: String },
    TransferShare { id: String, new_owner: String },
    DeleteShare { id: String },
    GetAllShares,
}

impl Invocation {
    /// Every function name the ledger answers to.
    pub const FUNCTIONS: [&'static str; 7] = [
        "InitLedger",
        "CreateShare",
        "ReadShare",
        "ShareExists",
        "TransferShare",
        "DeleteShare",
        "GetAllShares",
    ];

    pub fn parse<A: AsRef<str>>(function: &str, args: &[A]) -> LedgerResult<Self> {
        let arg = |i: usize| args[i].as_ref().to_string();
        let invocation = match function {
            "InitLedger" => {
                expect_args(function, args, 0)?;
                Self::InitLedger
            }
            "CreateShare" => {
                expect_args(function, args, 1)?;
                Self::CreateShare { id: arg(0) }
            }
            "ReadShare" => {
                expect_args(function, args, 1)?;
                Self::ReadShare { id: arg(0) }
            }
            "ShareExists" => {
                expect_args(function, args, 1)?;
                Self::ShareExists { id: arg(0) }
            }
            "TransferShare" => {
                expect_args(function, args, 2)?;
                Self::TransferShare {
                    id: arg(0),
                    new_owner: arg(1),
                }
            }
            "DeleteShare" => {
                expect_args(function, args, 1)?;
                Self::DeleteShare { id: arg(0) }
            }
            "GetAllShares" => {
                expect_args(function, args, 0)?;
                Self::GetAllShares
            }
            other => return Err(LedgerError::UnknownFunction(other.to_string())),
        };
        Ok(invocation)
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            Self::InitLedger => "InitLedger",
            Self::CreateShare { .. } => "CreateShare",
            Self::ReadShare { .. } => "ReadShare",
            Self::ShareExists { .. } => "ShareExists",
            Self::TransferShare { .. } => "TransferShare",
            Self::DeleteShare { .. } => "DeleteShare",
            Self::GetAllShares => "GetAllShares",
        }
    }

    /// Returns `true` if the call never writes to the world state.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::ReadShare { .. } | Self::ShareExists { .. } | Self::GetAllShares
        )
    }
}

fn expect_args<A>(function: &str, args: &[A], expected: usize) -> LedgerResult<()> {
    if args.len() != expected {
        return Err(LedgerError::ArgumentCount {
            function: function.to_string(),
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

impl<S: WorldState> ShareLedger<S> {
    /// Run one call and return its payload.
    ///
    /// Create and read return the serialized share, `ShareExists` returns
    /// `"true"` or `"false"`, `GetAllShares` returns the JSON array of
    /// entries, and the remaining calls return an empty payload.
    pub fn invoke(&self, invocation: &Invocation) -> LedgerResult<String> {
        tracing::debug!(function = invocation.function_name(), "invoke");
        match invocation {
            Invocation::InitLedger => self.init_ledger().map(|()| String::new()),
            Invocation::CreateShare { id } => self.create_share(id),
            Invocation::ReadShare { id } => self.read_share(id),
            Invocation::ShareExists { id } => self.share_exists(id).map(|b| b.to_string()),
            Invocation::TransferShare { id, new_owner } => {
                self.transfer_share(id, new_owner).map(|()| String::new())
            }
            Invocation::DeleteShare { id } => self.delete_share(id).map(|()| String::new()),
            Invocation::GetAllShares => self.get_all_shares_json(),
        }
    }

    /// Parse and run a call in one step.
    pub fn invoke_function<A: AsRef<str>>(&self, function: &str, args: &[A]) -> LedgerResult<String> {
        self.invoke(&Invocation::parse(function, args)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use share_store::InMemoryWorldState;

    const NO_ARGS: [&str; 0] = [];

    fn ledger() -> ShareLedger<InMemoryWorldState> {
        ShareLedger::new(InMemoryWorldState::new())
    }

    #[test]
    fn parses_every_function() {
        for name in Invocation::FUNCTIONS {
            let args: Vec<&str> = match name {
                "TransferShare" => vec!["0", "CEO"],
                "InitLedger" | "GetAllShares" => vec![],
                _ => vec!["0"],
            };
            let invocation = Invocation::parse(name, args.as_slice()).unwrap();
            assert_eq!(invocation.function_name(), name);
        }
    }

    #[test]
    fn parse_transfer_arguments() {
        let invocation = Invocation::parse("TransferShare", &["7", "Alice"]).unwrap();
        assert_eq!(
            invocation,
            Invocation::TransferShare {
                id: "7".into(),
                new_owner: "Alice".into()
            }
        );
        assert!(!invocation.is_read_only());
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = Invocation::parse("BurnShare", &["0"]).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownFunction(name) if name == "BurnShare"));
    }

    #[test]
    fn argument_count_is_checked() {
        let err = Invocation::parse("TransferShare", &["0"]).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ArgumentCount { expected: 2, actual: 1, .. }
        ));
        assert!(Invocation::parse("GetAllShares", &["extra"]).is_err());
    }

    #[test]
    fn read_only_classification() {
        assert!(Invocation::GetAllShares.is_read_only());
        assert!(Invocation::ShareExists { id: "0".into() }.is_read_only());
        assert!(!Invocation::InitLedger.is_read_only());
    }

    #[test]
    fn invoke_payloads() {
        let ledger = ledger();
        assert_eq!(ledger.invoke_function("InitLedger", &NO_ARGS).unwrap(), "");
        assert_eq!(ledger.invoke_function("ShareExists", &["3"]).unwrap(), "true");
        assert_eq!(ledger.invoke_function("ShareExists", &["9"]).unwrap(), "false");
        assert_eq!(ledger.invoke_function("TransferShare", &["3", "Enterprise"]).unwrap(), "");
        assert_eq!(ledger.invoke_function("DeleteShare", &["3"]).unwrap(), "");
        assert_eq!(ledger.invoke_function("ShareExists", &["3"]).unwrap(), "false");

        let created = ledger.invoke_function("CreateShare", &["5"]).unwrap();
        assert_eq!(ledger.invoke_function("ReadShare", &["5"]).unwrap(), created);

        let all = ledger.invoke_function("GetAllShares", &NO_ARGS).unwrap();
        let entries: Vec<share_types::LedgerEntry> = serde_json::from_str(&all).unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["0", "1", "2", "4", "5"]);
    }

    #[test]
    fn invoke_surfaces_domain_errors() {
        let ledger = ledger();
        ledger.init_ledger().unwrap();
        assert!(ledger
            .invoke_function("ReadShare", &["nope"])
            .unwrap_err()
            .is_not_found());
        assert!(ledger
            .invoke_function("DeleteShare", &["4"])
            .unwrap_err()
            .is_unauthorized());
    }
}
