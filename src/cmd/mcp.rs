/*!
`mcp.rs`

The `mcp` command group. `mcp serve` exposes every other leaf command of
the tree as an MCP tool over stdio.

  labctl mcp serve [--prefix P] [--config FILE] [--subprocess]
                   [--timeout SECS] [--exclude PATH]...

The group is annotated `exclude`, so the server never lists itself.
*/

use std::io::Write;

use anyhow::{Context, Result};

use crate::mcp::{self, BridgeServer, ServeConfig};
use crate::tree::{CommandNode, FlagDescriptor, ParsedArgs};

fn serve(args: &ParsedArgs, _out: &mut dyn Write) -> Result<()> {
    let config = ServeConfig::resolve(args)?;
    tracing::debug!(?config, "resolved serve configuration");

    let server = BridgeServer::from_config(super::command_tree(), &config)?;

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(mcp::serve_stdio(server))
}

pub fn mcp_node() -> CommandNode {
    CommandNode::new("mcp")
        .about("Model Context Protocol integration")
        .exclude()
        .child(
            CommandNode::new("serve")
                .about("Serve labctl commands as MCP tools over stdio")
                .long_about(
                    "Start an MCP server on stdin/stdout. Every leaf command becomes a tool \
                     named <prefix>_<group>_<command>; calls run in-process (or by re-running \
                     this binary with --subprocess) and the output is paginated.",
                )
                .flag(FlagDescriptor::string("prefix", "Tool name prefix (env LABCTL_MCP_PREFIX)"))
                .flag(FlagDescriptor::string("config", "YAML or JSON config file (env LABCTL_MCP_CONFIG)"))
                .flag(FlagDescriptor::bool("subprocess", "Re-execute this binary per call instead of running in-process"))
                .flag(FlagDescriptor::number("timeout", "Kill subprocess commands running longer than SECS"))
                .flag(FlagDescriptor::strings("exclude", "Command path to hide, e.g. label.delete (repeatable)"))
                .action(serve),
        )
}
