//! Tool registry: one entry per exposed leaf command, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{Tool, ToolAnnotations};

use super::schema::{ToolDescriptor, build_tool};
use crate::tree::{CommandNode, FlagDescriptor, effective_flags, walk};

/// A registered tool plus what a call needs to translate and execute it.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub path: Vec<String>,
    /// Effective flag table in declaration order (own, then inherited).
    pub flags: Vec<FlagDescriptor>,
}

impl RegisteredTool {
    pub fn to_mcp_tool(&self) -> Tool {
        Tool::new(
            self.descriptor.name.clone(),
            self.descriptor.description.clone(),
            Arc::new(self.descriptor.input_schema.clone()),
        )
        .annotate(ToolAnnotations::new().destructive(self.descriptor.destructive))
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Register every runnable node below `root`.
    ///
    /// Skipped: the root itself, grouping nodes, hidden or `exclude`-annotated
    /// nodes (with their whole subtree), and any path starting with one of
    /// `excluded`.
    pub fn build(root: &CommandNode, prefix: &str, excluded: &[Vec<String>]) -> Self {
        let mut registry = ToolRegistry::default();
        let mut blocked: Vec<Vec<String>> = excluded.to_vec();

        for entry in walk(root) {
            if entry.is_root() {
                continue;
            }
            if blocked.iter().any(|b| entry.path.starts_with(b)) {
                continue;
            }
            if entry.node.hidden || entry.node.exclude {
                tracing::debug!(path = %entry.path.join(" "), "excluding command subtree");
                blocked.push(entry.path.clone());
                continue;
            }
            if !entry.node.is_runnable() {
                continue;
            }

            let descriptor = build_tool(prefix, entry.node, &entry.path, &entry.inherited);
            if registry.by_name.contains_key(&descriptor.name) {
                tracing::warn!(tool = %descriptor.name, "duplicate tool name; keeping the first");
                continue;
            }
            tracing::trace!(tool = %descriptor.name, destructive = descriptor.destructive, "registered tool");
            registry
                .by_name
                .insert(descriptor.name.clone(), registry.tools.len());
            registry.tools.push(RegisteredTool {
                descriptor,
                path: entry.path.clone(),
                flags: effective_flags(entry.node, &entry.inherited),
            });
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn to_mcp_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(RegisteredTool::to_mcp_tool).collect()
    }
}

/// Split a user-supplied command path (`issue.close` or `issue close`).
pub fn parse_path(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == '.' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> CommandNode {
        CommandNode::new("labctl")
            .persistent_flag(FlagDescriptor::string("repo", "repository"))
            .child(
                CommandNode::new("issue")
                    .about("Work with issues")
                    .child(
                        CommandNode::new("list")
                            .about("List issues")
                            .flag(FlagDescriptor::bool("closed", "closed"))
                            .safe(true)
                            .action(|_, _| Ok(())),
                    )
                    .child(CommandNode::new("close").action(|_, _| Ok(()))),
            )
            .child(
                CommandNode::new("mcp")
                    .exclude()
                    .child(CommandNode::new("serve").action(|_, _| Ok(()))),
            )
            .child(CommandNode::new("debug").hide().action(|_, _| Ok(())))
    }

    #[test]
    fn registers_only_exposed_leaves() {
        let registry = ToolRegistry::build(&tree(), "labctl", &[]);
        let names: Vec<&str> = registry.iter().map(|t| t.descriptor.name.as_str()).collect();
        assert_eq!(names, vec!["labctl_issue_list", "labctl_issue_close"]);
        assert!(registry.get("labctl_mcp_serve").is_none());
        assert!(registry.get("labctl_debug").is_none());
        assert!(registry.get("labctl").is_none());
    }

    #[test]
    fn configured_exclusions_block_subtrees() {
        let registry = ToolRegistry::build(&tree(), "lab", &[parse_path("issue.close")]);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("lab_issue_list").is_some());

        let registry = ToolRegistry::build(&tree(), "lab", &[parse_path("issue")]);
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_tool_carries_path_and_flags() {
        let registry = ToolRegistry::build(&tree(), "labctl", &[]);
        let tool = registry.get("labctl_issue_list").unwrap();
        assert_eq!(tool.path, vec!["issue", "list"]);
        let names: Vec<&str> = tool.flags.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["closed", "repo"]);
    }

    #[test]
    fn mcp_tool_has_schema_and_destructive_hint() {
        let registry = ToolRegistry::build(&tree(), "labctl", &[]);
        let tools = registry.to_mcp_tools();
        let list = tools.iter().find(|t| t.name == "labctl_issue_list").unwrap();
        let close = tools.iter().find(|t| t.name == "labctl_issue_close").unwrap();
        assert_eq!(
            list.annotations.as_ref().and_then(|a| a.destructive_hint),
            Some(false)
        );
        assert_eq!(
            close.annotations.as_ref().and_then(|a| a.destructive_hint),
            Some(true)
        );
        assert_eq!(list.input_schema["type"], "object");
        assert!(list.input_schema["properties"]["flags"]["properties"]["closed"].is_object());
    }

    #[test]
    fn parse_path_accepts_dots_and_spaces() {
        assert_eq!(parse_path("issue.close"), vec!["issue", "close"]);
        assert_eq!(parse_path(" mr  merge "), vec!["mr", "merge"]);
        assert!(parse_path("").is_empty());
    }
}
