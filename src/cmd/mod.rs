/*!
Command tree of the `labctl` CLI.

  labctl [-v] [-q] [-R OWNER/REPO] <group> <command> [flags] [args]

Groups:
  issue / mr / label   resource commands (resources.rs)
  mcp                  MCP bridge (mcp.rs), never exposed as tools itself

Conventions:
  - Each module exposes a `*_node()` / `*_nodes()` builder.
  - Actions write to the writer they are given, never to stdout directly,
    so they can run both from the terminal and in-process under `mcp serve`.
*/

pub mod mcp;
pub mod resources;

use crate::tree::{CommandNode, FlagDescriptor};

/// The full command tree.
pub fn command_tree() -> CommandNode {
    let mut root = CommandNode::new("labctl")
        .about("labctl - work with a project-management server from the command line")
        .persistent_flag(FlagDescriptor::bool("verbose", "Enable debug logging").short('v'))
        .persistent_flag(FlagDescriptor::bool("quiet", "Silence all non-error output").short('q'))
        .persistent_flag(
            FlagDescriptor::string("repo", "Select another repository (OWNER/REPO or GROUP/NAMESPACE/REPO)")
                .short('R'),
        );
    for node in resources::resource_nodes() {
        root = root.child(node);
    }
    root.child(mcp::mcp_node())
}
