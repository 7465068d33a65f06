use crate::cart::{Control, RowId};
use crate::error::Error;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "rscart")]
#[command(about = "Terminal shopping cart with live totals")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Catalog file (TOML). Defaults to the built-in three-item catalog
    #[arg(long, short = 'c', global = true)]
    pub catalog: Option<PathBuf>,

    /// Discount code to apply at startup
    #[arg(long, global = true)]
    pub code: Option<String>,

    /// Write logs to this file (the interactive view never logs to the terminal)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay interactions without the TUI and print the resulting totals
    Total {
        /// Interaction to replay, in order (inc:1, dec:2, remove:3, set:1=4,
        /// click:inc-2, code:DESCUENTO10)
        #[arg(long = "action", short = 'a', value_parser = parse_action)]
        actions: Vec<Action>,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// One scripted interaction for the headless replay
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Click on the element with this identifier
    Click(String),
    /// Type this text into a row's quantity field
    Input { row: RowId, value: String },
    /// Submit the discount form
    Code(String),
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidAction(s.to_string());
        let (verb, arg) = s.split_once(':').ok_or_else(invalid)?;
        let row = |arg: &str| arg.parse::<RowId>().map_err(|_| invalid());

        let action = match verb.trim() {
            "inc" => Action::Click(Control::Increment.element_id(row(arg)?)),
            "dec" => Action::Click(Control::Decrement.element_id(row(arg)?)),
            "remove" => Action::Click(Control::Remove.element_id(row(arg)?)),
            "click" if !arg.trim().is_empty() => Action::Click(arg.trim().to_string()),
            "set" => {
                let (id, value) = arg.split_once('=').ok_or_else(invalid)?;
                Action::Input {
                    row: row(id)?,
                    value: value.to_string(),
                }
            }
            "code" => Action::Code(arg.to_string()),
            _ => return Err(invalid()),
        };
        Ok(action)
    }
}

fn parse_action(s: &str) -> Result<Action, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.catalog
            && !path.exists()
        {
            return Err(format!("Catalog file not found: {}", path.display()));
        }

        if let Some(path) = &self.log_file
            && path.is_dir()
        {
            return Err(format!("Log file is a directory: {}", path.display()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            "inc:1".parse::<Action>().unwrap(),
            Action::Click("inc-1".to_string())
        );
        assert_eq!(
            "remove:3".parse::<Action>().unwrap(),
            Action::Click("remove-3".to_string())
        );
        assert_eq!(
            "set:2=-5".parse::<Action>().unwrap(),
            Action::Input {
                row: RowId(2),
                value: "-5".to_string()
            }
        );
        assert_eq!(
            "set:2=".parse::<Action>().unwrap(),
            Action::Input {
                row: RowId(2),
                value: String::new()
            }
        );
        assert_eq!(
            "code: descuento10 ".parse::<Action>().unwrap(),
            Action::Code(" descuento10 ".to_string())
        );
        assert_eq!(
            "click:subtotal".parse::<Action>().unwrap(),
            Action::Click("subtotal".to_string())
        );
    }

    #[test]
    fn test_reject_bad_actions() {
        for bad in ["inc", "inc:x", "jump:1", "set:1", "click:", "dec:-1"] {
            assert!(bad.parse::<Action>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_cli_parses_total() {
        let cli = Cli::try_parse_from([
            "rscart", "total", "-a", "inc:1", "--action", "set:2=0", "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Total { actions, json, csv }) => {
                assert_eq!(actions.len(), 2);
                assert!(json);
                assert!(!csv);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_json_and_csv() {
        assert!(Cli::try_parse_from(["rscart", "total", "--json", "--csv"]).is_err());
    }

    #[test]
    fn test_validate_missing_catalog() {
        let cli = Cli::try_parse_from(["rscart", "--catalog", "/nonexistent/cart.toml"]).unwrap();
        assert!(cli.validate().is_err());
    }
}
