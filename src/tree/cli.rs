//! clap integration: build `clap::Command`s from the declarative tree and
//! dispatch parsed invocations to node actions.

use std::ffi::OsString;
use std::io::Write;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};

use super::{Action, CommandNode, FlagDescriptor, FlagKind, FlagValue, HELP_FLAG, ParsedArgs, effective_flags};

/// Argument id of the trailing positional list every runnable node accepts.
pub const ARGS_ID: &str = "args";

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("command '{0}' is a group; pick one of its subcommands")]
    NotRunnable(String),
    #[error("unknown command path: '{0}'")]
    UnknownCommand(String),
}

/// Generate the full `clap::Command` for `node` and all of its children.
pub fn to_clap(node: &CommandNode) -> Command {
    let mut cmd = describe(Command::new(node.name.clone()), node);
    if node.hidden {
        cmd = cmd.hide(true);
    }
    for flag in node.flags.iter().filter(|f| f.name != HELP_FLAG) {
        cmd = cmd.arg(flag_arg(flag));
    }
    for flag in node.persistent_flags.iter().filter(|f| f.name != HELP_FLAG) {
        cmd = cmd.arg(flag_arg(flag).global(true));
    }
    if node.is_runnable() {
        cmd = cmd.arg(positional_arg());
        if !node.children.is_empty() {
            cmd = cmd.args_conflicts_with_subcommands(true);
        }
    } else if !node.children.is_empty() {
        cmd = cmd.subcommand_required(true).arg_required_else_help(true);
    }
    for child in &node.children {
        cmd = cmd.subcommand(to_clap(child));
    }
    cmd
}

/// Standalone parser for a single leaf with its effective flag set.
pub fn leaf_command(node: &CommandNode, flags: &[FlagDescriptor]) -> Command {
    let mut cmd = describe(Command::new(node.name.clone()), node).no_binary_name(true);
    for flag in flags.iter().filter(|f| f.name != HELP_FLAG) {
        cmd = cmd.arg(flag_arg(flag));
    }
    cmd.arg(positional_arg())
}

fn describe(mut cmd: Command, node: &CommandNode) -> Command {
    if !node.about.is_empty() {
        cmd = cmd.about(node.about.clone());
    }
    if !node.long_about.is_empty() {
        cmd = cmd.long_about(node.long_about.clone());
    }
    cmd
}

fn flag_arg(flag: &FlagDescriptor) -> Arg {
    let mut arg = Arg::new(flag.name.clone())
        .long(flag.name.clone())
        .help(flag.help.clone())
        .hide(flag.hidden);
    if let Some(c) = flag.short {
        arg = arg.short(c);
    }
    match flag.kind {
        FlagKind::Bool => arg.action(ArgAction::SetTrue),
        FlagKind::String => arg
            .action(ArgAction::Set)
            .value_name("STRING")
            .allow_hyphen_values(true),
        FlagKind::Number => arg
            .action(ArgAction::Set)
            .value_name("NUMBER")
            .allow_negative_numbers(true)
            .value_parser(parse_number),
        FlagKind::StringArray => arg
            .action(ArgAction::Append)
            .value_name("STRING")
            .allow_hyphen_values(true),
    }
}

fn positional_arg() -> Arg {
    Arg::new(ARGS_ID)
        .value_name("ARGS")
        .help("Positional arguments")
        .num_args(0..)
        .action(ArgAction::Append)
}

/// Validate a numeric flag value but keep its text so large ids stay exact.
fn parse_number(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.parse::<i64>().is_ok() || trimmed.parse::<u64>().is_ok() || trimmed.parse::<f64>().is_ok() {
        Ok(trimmed.to_string())
    } else {
        Err(format!("'{raw}' is not a number"))
    }
}

/// Collect the declared flags and positionals out of `matches`.
pub fn parsed_args(matches: &ArgMatches, flags: &[FlagDescriptor], path: Vec<String>) -> ParsedArgs {
    let mut parsed = ParsedArgs {
        path,
        ..Default::default()
    };
    for flag in flags.iter().filter(|f| f.name != HELP_FLAG) {
        let id = flag.name.as_str();
        let value = match flag.kind {
            FlagKind::Bool => matches
                .try_get_one::<bool>(id)
                .ok()
                .flatten()
                .map(|b| FlagValue::Bool(*b)),
            FlagKind::String | FlagKind::Number => matches
                .try_get_one::<String>(id)
                .ok()
                .flatten()
                .map(|s| FlagValue::Str(s.clone())),
            FlagKind::StringArray => matches
                .try_get_many::<String>(id)
                .ok()
                .flatten()
                .map(|vals| FlagValue::Many(vals.cloned().collect())),
        };
        if let Some(v) = value {
            parsed.flags.insert(flag.name.clone(), v);
        }
    }
    if let Ok(Some(vals)) = matches.try_get_many::<String>(ARGS_ID) {
        parsed.positionals = vals.cloned().collect();
    }
    parsed
}

/// Outcome of parsing an argv for a single leaf without exiting the process.
#[derive(Debug)]
pub enum LeafParse {
    Parsed(ParsedArgs),
    /// `--help` (or similar) was requested; carries the rendered text.
    Display(String),
    /// Usage error; carries the rendered clap diagnostic.
    Invalid(String),
}

/// Parse `argv` (no program name) against a leaf's effective flags.
pub fn parse_leaf(node: &CommandNode, flags: &[FlagDescriptor], path: &[String], argv: &[String]) -> LeafParse {
    match leaf_command(node, flags).try_get_matches_from(argv) {
        Ok(matches) => LeafParse::Parsed(parsed_args(&matches, flags, path.to_vec())),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            LeafParse::Display(err.render().to_string())
        }
        Err(err) => LeafParse::Invalid(err.render().to_string()),
    }
}

/// A fully parsed command line, ready to dispatch.
pub struct Invocation {
    pub parsed: ParsedArgs,
    action: Action,
}

impl Invocation {
    /// Run the selected action with stdout as its output.
    ///
    /// Stdout is not locked here: `mcp serve` hands stdout to the transport,
    /// which writes to it from other threads.
    pub fn invoke(self) -> anyhow::Result<()> {
        self.invoke_to(&mut std::io::stdout())
    }

    pub fn invoke_to(self, out: &mut dyn Write) -> anyhow::Result<()> {
        tracing::debug!(path = %self.parsed.path.join(" "), "dispatching command");
        (self.action)(&self.parsed, out)?;
        out.flush()?;
        Ok(())
    }
}

/// Parse the process arguments against the tree. Usage errors and `--help`
/// exit the process via clap.
pub fn parse<I, T>(root: &CommandNode, args: I) -> anyhow::Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = to_clap(root)
        .version(env!("CARGO_PKG_VERSION"))
        .propagate_version(true)
        .disable_help_subcommand(true)
        .get_matches_from(args);
    select(root, &matches)
}

fn select(root: &CommandNode, matches: &ArgMatches) -> anyhow::Result<Invocation> {
    let mut node = root;
    let mut current = matches;
    let mut path: Vec<String> = Vec::new();
    let mut inherited: Vec<FlagDescriptor> = Vec::new();
    while let Some((name, sub)) = current.subcommand() {
        let child = node
            .find_child(name)
            .ok_or_else(|| TreeError::UnknownCommand(name.to_string()))?;
        let mut next: Vec<FlagDescriptor> = node.persistent_flags.clone();
        next.extend(inherited);
        inherited = next;
        path.push(name.to_string());
        node = child;
        current = sub;
    }

    let action = node
        .action
        .clone()
        .ok_or_else(|| TreeError::NotRunnable(path.join(" ")))?;
    let flags = effective_flags(node, &inherited);
    let parsed = parsed_args(current, &flags, path);
    Ok(Invocation { parsed, action })
}
