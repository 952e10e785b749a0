use anyhow::Result;

mod cmd;
mod mcp;
mod tree;
mod utils;

/// labctl - project-management CLI
///
/// Command layout:
///   labctl issue <list|view|create|close|subscribe> [flags] [args]
///   labctl mr    <list|view|merge> [flags] [args]
///   labctl label <list|create|delete> [flags] [args]
///   labctl mcp serve [--prefix P] [--config FILE] [--subprocess] [--timeout SECS] [--exclude PATH]...
///
/// Global flags / env:
///   -v / --verbose  Debug logging
///   -q / --quiet    Errors only
///   -R / --repo     OWNER/REPO the command applies to
///   RUST_LOG        Overrides the log filter entirely
///
/// Examples:
///   labctl issue list -R group/project --label bug
///   labctl mcp serve --exclude label.delete
fn main() -> Result<()> {
    let root = cmd::command_tree();
    let invocation = tree::parse(&root, std::env::args_os())?;

    // Initialize logging
    let level = utils::derive_level(
        invocation.parsed.flag("verbose"),
        invocation.parsed.flag("quiet"),
    );
    utils::init_logging(level);

    invocation.invoke()
}
