//! Depth-first traversal of a command tree.

use super::{CommandNode, FlagDescriptor};

/// One visited node.
#[derive(Debug, Clone)]
pub struct WalkEntry<'a> {
    pub node: &'a CommandNode,
    /// Names from (excluding) the root down to `node`. Empty for the root.
    pub path: Vec<String>,
    /// Persistent flags declared by ancestors, nearest ancestor first.
    pub inherited: Vec<FlagDescriptor>,
}

impl WalkEntry<'_> {
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

/// Visit `root` and every descendant, parents before children, children in
/// declaration order. The root is yielded too; filtering is up to the caller.
pub fn walk(root: &CommandNode) -> Vec<WalkEntry<'_>> {
    let mut out = Vec::new();
    visit(root, Vec::new(), Vec::new(), &mut out);
    out
}

fn visit<'a>(
    node: &'a CommandNode,
    path: Vec<String>,
    inherited: Vec<FlagDescriptor>,
    out: &mut Vec<WalkEntry<'a>>,
) {
    let mut for_children: Vec<FlagDescriptor> = node.persistent_flags.clone();
    for_children.extend(inherited.iter().cloned());

    out.push(WalkEntry {
        node,
        path: path.clone(),
        inherited,
    });

    for child in &node.children {
        let mut child_path = path.clone();
        child_path.push(child.name.clone());
        visit(child, child_path, for_children.clone(), out);
    }
}
