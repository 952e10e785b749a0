//! Declarative command tree.
//!
//! Every command the CLI offers is described once as a [`CommandNode`]:
//! names, help text, a flag table, children, an optional action and a few
//! annotations. The same description drives two consumers:
//!   - `cli`  : generates the `clap::Command` used to parse real invocations
//!   - `walk` : depth-first traversal used by the MCP bridge to enumerate tools
//!
//! Flags carry an explicit [`FlagKind`], so schema generation never has to
//! guess at the type of a value parser.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

pub mod cli;
pub mod walk;

pub use cli::{TreeError, parse};
pub use walk::walk;

/// Name of the flag every generated command reserves for help output.
pub const HELP_FLAG: &str = "help";

/// Executable body of a leaf command. Output goes to `out`, never to stdout.
pub type Action = Arc<dyn Fn(&ParsedArgs, &mut dyn Write) -> anyhow::Result<()> + Send + Sync>;

/// Primitive value kinds a flag can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Bool,
    String,
    Number,
    StringArray,
}

/// One entry of a node's flag table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDescriptor {
    /// kebab-case long name (without leading dashes)
    pub name: String,
    pub short: Option<char>,
    pub kind: FlagKind,
    pub hidden: bool,
    pub help: String,
}

impl FlagDescriptor {
    pub fn new(name: impl Into<String>, kind: FlagKind, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            kind,
            hidden: false,
            help: help.into(),
        }
    }

    pub fn bool(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Bool, help)
    }

    pub fn string(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::String, help)
    }

    pub fn number(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Number, help)
    }

    pub fn strings(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::StringArray, help)
    }

    pub fn short(mut self, c: char) -> Self {
        self.short = Some(c);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Whether the flag takes part in tool schemas.
    pub fn is_visible(&self) -> bool {
        !self.hidden && self.name != HELP_FLAG
    }
}

/// A node of the command tree. Nodes without an action only group children.
#[derive(Clone, Default)]
pub struct CommandNode {
    pub name: String,
    pub about: String,
    pub long_about: String,
    pub flags: Vec<FlagDescriptor>,
    /// Flags declared here and inherited by every descendant.
    pub persistent_flags: Vec<FlagDescriptor>,
    pub children: Vec<CommandNode>,
    pub action: Option<Action>,
    /// Explicit "this command mutates state" annotation.
    pub destructive: Option<bool>,
    /// Explicit "this command is read-only" annotation.
    pub safe: Option<bool>,
    pub hidden: bool,
    /// Never expose this node (or anything below it) as a tool.
    pub exclude: bool,
}

impl CommandNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = about.into();
        self
    }

    pub fn long_about(mut self, long_about: impl Into<String>) -> Self {
        self.long_about = long_about.into();
        self
    }

    pub fn flag(mut self, flag: FlagDescriptor) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn persistent_flag(mut self, flag: FlagDescriptor) -> Self {
        self.persistent_flags.push(flag);
        self
    }

    pub fn child(mut self, child: CommandNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn action<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParsedArgs, &mut dyn Write) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(f));
        self
    }

    pub fn destructive(mut self, destructive: bool) -> Self {
        self.destructive = Some(destructive);
        self
    }

    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = Some(safe);
        self
    }

    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    pub fn is_runnable(&self) -> bool {
        self.action.is_some()
    }

    pub fn find_child(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Resolve a path of child names below this node, also returning the
    /// persistent flags the target inherits (nearest ancestor first).
    pub fn resolve(&self, path: &[String]) -> Option<(&CommandNode, Vec<FlagDescriptor>)> {
        let mut node = self;
        let mut inherited: Vec<FlagDescriptor> = Vec::new();
        for name in path {
            let child = node.find_child(name)?;
            let mut next = node.persistent_flags.clone();
            next.extend(inherited);
            inherited = next;
            node = child;
        }
        Some((node, inherited))
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("persistent_flags", &self.persistent_flags)
            .field("children", &self.children)
            .field("runnable", &self.is_runnable())
            .field("destructive", &self.destructive)
            .field("safe", &self.safe)
            .finish()
    }
}

/// Merge a node's own flags with inherited persistent flags. The node's own
/// flags come first and win on name conflicts; persistent flags declared on
/// the node itself also apply to it.
pub fn effective_flags(node: &CommandNode, inherited: &[FlagDescriptor]) -> Vec<FlagDescriptor> {
    let mut merged: Vec<FlagDescriptor> = Vec::new();
    for flag in node
        .flags
        .iter()
        .chain(node.persistent_flags.iter())
        .chain(inherited.iter())
    {
        if !merged.iter().any(|f| f.name == flag.name) {
            merged.push(flag.clone());
        }
    }
    merged
}

/// A parsed flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    Str(String),
    Many(Vec<String>),
}

/// Parsed invocation handed to an [`Action`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub path: Vec<String>,
    pub flags: BTreeMap<String, FlagValue>,
    pub positionals: Vec<String>,
}

impl ParsedArgs {
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.flags.get(name), Some(FlagValue::Bool(true)))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        match self.flags.get(name) {
            Some(FlagValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn values(&self, name: &str) -> &[String] {
        match self.flags.get(name) {
            Some(FlagValue::Many(v)) => v.as_slice(),
            _ => &[],
        }
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positionals.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_flags_win_over_inherited() {
        let node = CommandNode::new("list")
            .flag(FlagDescriptor::number("repo", "local override"))
            .flag(FlagDescriptor::bool("all", "all items"));
        let inherited = vec![
            FlagDescriptor::string("repo", "global repo"),
            FlagDescriptor::bool("verbose", "verbose"),
        ];
        let merged = effective_flags(&node, &inherited);
        let names: Vec<&str> = merged.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["repo", "all", "verbose"]);
        assert_eq!(merged[0].kind, FlagKind::Number);
    }

    #[test]
    fn help_and_hidden_flags_are_not_visible() {
        assert!(!FlagDescriptor::bool("help", "help").is_visible());
        assert!(!FlagDescriptor::string("token", "t").hidden().is_visible());
        assert!(FlagDescriptor::string("state", "s").is_visible());
    }

    #[test]
    fn resolve_finds_nested_paths() {
        let root = CommandNode::new("root").child(
            CommandNode::new("issue").child(CommandNode::new("list").action(|_, _| Ok(()))),
        );
        let path = vec!["issue".to_string(), "list".to_string()];
        let (found, _) = root.resolve(&path).unwrap();
        assert_eq!(found.name, "list");
        assert!(found.is_runnable());
        assert!(root.resolve(&["mr".to_string()]).is_none());
    }

    #[test]
    fn resolve_collects_ancestor_persistent_flags() {
        let root = CommandNode::new("root")
            .persistent_flag(FlagDescriptor::string("repo", "repository"))
            .child(
                CommandNode::new("issue")
                    .persistent_flag(FlagDescriptor::bool("web", "browser"))
                    .child(CommandNode::new("list").action(|_, _| Ok(()))),
            );
        let (node, inherited) = root.resolve(&["issue".into(), "list".into()]).unwrap();
        assert_eq!(node.name, "list");
        let names: Vec<&str> = inherited.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["web", "repo"]);
        assert!(root.resolve(&["issue".into(), "nope".into()]).is_none());
    }

    #[test]
    fn parsed_args_accessors() {
        let mut parsed = ParsedArgs::default();
        parsed.flags.insert("all".into(), FlagValue::Bool(true));
        parsed.flags.insert("state".into(), FlagValue::Str("opened".into()));
        parsed
            .flags
            .insert("label".into(), FlagValue::Many(vec!["bug".into()]));
        parsed.positionals.push("42".into());

        assert!(parsed.flag("all"));
        assert!(!parsed.flag("state"));
        assert_eq!(parsed.value("state"), Some("opened"));
        assert_eq!(parsed.values("label"), ["bug".to_string()]);
        assert!(parsed.values("missing").is_empty());
        assert_eq!(parsed.positional(0), Some("42"));
    }
}
