use std::{ffi::OsString, path::PathBuf};

use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "slpd",
    about = "Encrypted key-value store unlocked by your SSH RSA key",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// RSA private key (PKCS#1 PEM or OpenSSH). Overrides SLP_KEY_PATH.
    #[arg(long = "key", global = true, value_name = "PATH")]
    pub key_path: Option<PathBuf>,

    /// Encrypted store file. Overrides SLP_STORE_FILE.
    #[arg(long = "store", global = true, value_name = "PATH")]
    pub store_file: Option<PathBuf>,

    /// Tag scope for set/get/list/dump.
    #[arg(short = 't', long = "tag", global = true, value_name = "TAG")]
    pub tag: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value: `set KEY VALUE` or `set KEY=VALUE`.
    Set {
        key: String,
        value: Option<String>,
    },
    /// Print the value stored under KEY.
    Get { key: String },
    /// Remove the first record named KEY, whatever its tag.
    #[command(name = "del", alias = "delete")]
    Delete { key: String },
    /// List keys, optionally only those containing FILTER.
    List {
        filter: Option<String>,
        /// Only untagged records.
        #[arg(long)]
        untagged: bool,
    },
    /// Print records as KEY=VALUE lines.
    Dump {
        /// Only untagged records.
        #[arg(long)]
        untagged: bool,
    },
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// `slpd KEY=VALUE` shorthand for `set`.
    #[command(external_subcommand)]
    Assign(Vec<OsString>),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a config file with the resolved paths if one does not exist.
    Init,
    /// Print the key and store paths that would be used.
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_separate_value() {
        let cli = Cli::try_parse_from(["slpd", "set", "user", "alice"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Set {
                key: "user".into(),
                value: Some("alice".into())
            }
        );
    }

    #[test]
    fn parses_global_tag_before_and_after_subcommand() {
        let before = Cli::try_parse_from(["slpd", "-t", "work", "get", "user"]).expect("parse");
        let after = Cli::try_parse_from(["slpd", "get", "user", "--tag", "work"]).expect("parse");
        assert_eq!(before.tag.as_deref(), Some("work"));
        assert_eq!(after.tag.as_deref(), Some("work"));
        assert_eq!(before.command, Command::Get { key: "user".into() });
    }

    #[test]
    fn parses_del_and_delete_alias() {
        for name in ["del", "delete"] {
            let cli = Cli::try_parse_from(["slpd", name, "k"]).expect("parse");
            assert_eq!(cli.command, Command::Delete { key: "k".into() });
        }
    }

    #[test]
    fn parses_list_filter_and_untagged_flag() {
        let cli = Cli::try_parse_from(["slpd", "list", "db", "--untagged"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::List {
                filter: Some("db".into()),
                untagged: true
            }
        );
    }

    #[test]
    fn bare_assignment_becomes_external_subcommand() {
        let cli = Cli::try_parse_from(["slpd", "TOKEN=abc"]).expect("parse");
        assert_eq!(cli.command, Command::Assign(vec![OsString::from("TOKEN=abc")]));
    }

    #[test]
    fn parses_path_overrides() {
        let cli = Cli::try_parse_from(["slpd", "dump", "--key", "/k", "--store", "/s"])
            .expect("parse");
        assert_eq!(cli.key_path, Some(PathBuf::from("/k")));
        assert_eq!(cli.store_file, Some(PathBuf::from("/s")));
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli = Cli::try_parse_from(["slpd", "config", "init"]).expect("parse");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }
}
