use std::{ffi::OsString, io::Write};

use color_eyre::{eyre::eyre, Result};
use slip_core::{RecordStore, TagFilter};
use tracing::warn;

use crate::cli::Command;

/// A store operation resolved from CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Set {
        key: String,
        value: String,
        tag: Option<String>,
    },
    Get {
        key: String,
        tag: Option<String>,
    },
    Delete {
        key: String,
    },
    List {
        filter: Option<String>,
        scope: TagFilter,
    },
    Dump {
        scope: TagFilter,
    },
}

impl Action {
    /// Map a parsed command plus the global `--tag` onto a store operation.
    pub fn from_command(command: Command, tag: Option<String>) -> Result<Self> {
        let tag = tag.filter(|t| !t.is_empty());
        let action = match command {
            Command::Set { key, value: Some(value) } => Action::Set { key, value, tag },
            Command::Set { key, value: None } => {
                let (key, value) = split_assignment(&key)?;
                Action::Set { key, value, tag }
            }
            Command::Get { key } => Action::Get { key, tag },
            Command::Delete { key } => {
                if tag.is_some() {
                    warn!("--tag is ignored by del; the first record with this key is removed");
                }
                Action::Delete { key }
            }
            Command::List { filter, untagged } => Action::List {
                filter: filter.filter(|f| !f.is_empty()),
                scope: scope_for(tag, untagged)?,
            },
            Command::Dump { untagged } => Action::Dump {
                scope: scope_for(tag, untagged)?,
            },
            Command::Assign(args) => {
                let (args, inline_tag) = take_inline_tag(args)?;
                let assignment = single_assignment(&args)?;
                let (key, value) = split_assignment(&assignment)?;
                let tag = inline_tag.filter(|t| !t.is_empty()).or(tag);
                Action::Set { key, value, tag }
            }
            Command::Config(_) => return Err(eyre!("config commands do not operate on the store")),
        };
        Ok(action)
    }
}

/// Run one action against the store, writing user-facing output to `out`.
pub fn execute<S: RecordStore>(store: &mut S, action: Action, out: &mut impl Write) -> Result<()> {
    match action {
        Action::Set { key, value, tag } => store.set(&key, &value, tag.as_deref())?,
        Action::Get { key, tag } => {
            let value = store.get(&key, tag.as_deref())?;
            writeln!(out, "{value}")?;
        }
        Action::Delete { key } => {
            store.delete(&key)?;
        }
        Action::List { filter, scope } => {
            for key in store.list(filter.as_deref(), &scope) {
                writeln!(out, "{key}")?;
            }
        }
        Action::Dump { scope } => {
            let dump = store.dump(&scope);
            if !dump.is_empty() {
                writeln!(out, "{dump}")?;
            }
        }
    }
    Ok(())
}

fn scope_for(tag: Option<String>, untagged: bool) -> Result<TagFilter> {
    match (tag, untagged) {
        (Some(_), true) => Err(eyre!("--untagged cannot be combined with --tag")),
        (None, true) => Ok(TagFilter::Untagged),
        (Some(tag), false) => Ok(TagFilter::Tagged(tag)),
        (None, false) => Ok(TagFilter::Any),
    }
}

fn split_assignment(arg: &str) -> Result<(String, String)> {
    arg.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| eyre!("invalid format `{arg}`; use KEY=VALUE or `set KEY VALUE`"))
}

/// Strip `-t TAG`, `--tag TAG` or `--tag=TAG` from raw shorthand arguments.
/// clap stops parsing options once it sees the external `KEY=VALUE` command.
fn take_inline_tag(args: Vec<OsString>) -> Result<(Vec<OsString>, Option<String>)> {
    let mut rest = Vec::with_capacity(args.len());
    let mut tag = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.to_str() {
            Some("-t" | "--tag") => {
                let value = iter
                    .next()
                    .ok_or_else(|| eyre!("--tag requires a value"))?;
                tag = Some(
                    value
                        .into_string()
                        .map_err(|_| eyre!("tag is not valid UTF-8"))?,
                );
            }
            Some(flag) if flag.starts_with("--tag=") => {
                tag = Some(flag["--tag=".len()..].to_string());
            }
            _ => rest.push(arg),
        }
    }
    Ok((rest, tag))
}

fn single_assignment(args: &[OsString]) -> Result<String> {
    match args {
        [only] => only
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| eyre!("argument is not valid UTF-8")),
        [first, ..] if !first.to_string_lossy().contains('=') => Err(eyre!(
            "unknown command `{}`",
            first.to_string_lossy()
        )),
        _ => Err(eyre!("expected a single KEY=VALUE assignment")),
    }
}
