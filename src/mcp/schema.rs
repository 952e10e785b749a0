//! Tool descriptors derived from command nodes.
//!
//! build_tool -> ToolDescriptor { name, description, destructive, input_schema }
//! Helpers: describe / truncate_at_word / flag_schema / is_destructive.

use serde_json::{Map, Value, json};

use crate::tree::{CommandNode, FlagDescriptor, FlagKind, effective_flags};

/// Character budget for the long-help part of a tool description.
pub const DESCRIPTION_BUDGET: usize = 100;
pub const DEFAULT_LIMIT: i64 = 50_000;
pub const DEFAULT_OFFSET: i64 = 0;

/// Everything needed to register one leaf command as a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub destructive: bool,
    pub input_schema: Map<String, Value>,
}

/// Tool name for a command path: `prefix_seg1_seg2`.
pub fn tool_name(prefix: &str, path: &[String]) -> String {
    let mut name = prefix.to_string();
    for segment in path {
        name.push('_');
        name.push_str(segment);
    }
    name
}

/// Cut `text` to at most `budget` characters, preferring a word boundary.
pub fn truncate_at_word(text: &str, budget: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= budget {
        return text.to_string();
    }
    if budget <= 3 {
        return chars[..budget].iter().collect();
    }
    let scan_from = budget.saturating_sub(4).min(chars.len() - 1);
    let boundary = (1..=scan_from)
        .rev()
        .find(|&i| chars[i] == ' ' || chars[i] == '\n');
    match boundary {
        Some(i) => {
            let head: String = chars[..i].iter().collect();
            format!("{}...", head.trim_end())
        }
        None => {
            let head: String = chars[..budget - 3].iter().collect();
            format!("{head}...")
        }
    }
}

/// Short help, then a blank line and the truncated long help when present.
pub fn describe(node: &CommandNode) -> String {
    let short = node.about.trim();
    let long = node.long_about.trim();
    match (short.is_empty(), long.is_empty()) {
        (true, true) => String::new(),
        (false, true) => short.to_string(),
        (true, false) => truncate_at_word(long, DESCRIPTION_BUDGET),
        (false, false) => format!("{short}\n\n{}", truncate_at_word(long, DESCRIPTION_BUDGET)),
    }
}

/// Minimal type descriptor for a flag. Kept to `{type}` only.
pub fn flag_schema(flag: &FlagDescriptor) -> Value {
    let ty = match flag.kind {
        FlagKind::Bool => "boolean",
        FlagKind::StringArray => "array",
        FlagKind::Number => "number",
        FlagKind::String => "string",
    };
    json!({ "type": ty })
}

/// Destructive hint: explicit `destructive`, else negated `safe`, else true.
pub fn is_destructive(node: &CommandNode) -> bool {
    if let Some(destructive) = node.destructive {
        return destructive;
    }
    if let Some(safe) = node.safe {
        return !safe;
    }
    true
}

/// Schema property key for a flag name.
pub fn property_key(flag_name: &str) -> String {
    flag_name.replace('-', "_")
}

/// JSON object schema with the four fixed members.
pub fn input_schema(flags: &[FlagDescriptor]) -> Map<String, Value> {
    let mut flag_props = Map::new();
    for flag in flags.iter().filter(|f| f.is_visible()) {
        flag_props
            .entry(property_key(&flag.name))
            .or_insert_with(|| flag_schema(flag));
    }

    let schema = json!({
        "type": "object",
        "properties": {
            "args": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Positional arguments, in order"
            },
            "flags": {
                "type": "object",
                "properties": flag_props,
                "description": "Command flags by name (underscores for dashes)"
            },
            "limit": {
                "type": "number",
                "default": DEFAULT_LIMIT,
                "description": "Maximum number of characters to return"
            },
            "offset": {
                "type": "number",
                "default": DEFAULT_OFFSET,
                "description": "Start character; negative counts from the end"
            }
        }
    });
    match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Build the descriptor for one node reached at `path`.
pub fn build_tool(
    prefix: &str,
    node: &CommandNode,
    path: &[String],
    inherited: &[FlagDescriptor],
) -> ToolDescriptor {
    let mut description = describe(node);
    if description.is_empty() {
        description = format!("Execute {}", path.join(" "));
    }
    let flags = effective_flags(node, inherited);
    ToolDescriptor {
        name: tool_name(prefix, path),
        description,
        destructive: is_destructive(node),
        input_schema: input_schema(&flags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn truncate_cuts_at_word_boundary() {
        assert_eq!(
            truncate_at_word("This is a long text that should be truncated", 20),
            "This is a long..."
        );
    }

    #[test]
    fn truncate_hard_cuts_without_spaces() {
        assert_eq!(truncate_at_word("Verylongtextwithnospaces", 10), "Verylon...");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_at_word("short", 10), "short");
        assert_eq!(truncate_at_word("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let text = "ééééééééééééé";
        let out = truncate_at_word(text, 8);
        assert_eq!(out, "ééééé...");
        assert_eq!(out.chars().count(), 8);
    }

    #[test]
    fn truncate_breaks_on_newline() {
        assert_eq!(truncate_at_word("first line\nsecond line here", 16), "first line...");
    }

    #[test]
    fn describe_combines_short_and_long() {
        let node = CommandNode::new("list")
            .about("List issues")
            .long_about("Lists issues of a project.");
        assert_eq!(describe(&node), "List issues\n\nLists issues of a project.");

        let long = "word ".repeat(40);
        let node = CommandNode::new("list").about("List issues").long_about(long);
        let desc = describe(&node);
        let (_, tail) = desc.split_once("\n\n").unwrap();
        assert!(tail.ends_with("..."));
        assert!(tail.chars().count() <= DESCRIPTION_BUDGET);
    }

    #[test]
    fn describe_empty_node_is_empty() {
        assert_eq!(describe(&CommandNode::new("x")), "");
    }

    #[test]
    fn flag_schema_mapping_is_minimal() {
        assert_eq!(flag_schema(&FlagDescriptor::bool("a", "")), json!({"type": "boolean"}));
        assert_eq!(flag_schema(&FlagDescriptor::string("a", "help")), json!({"type": "string"}));
        assert_eq!(flag_schema(&FlagDescriptor::number("a", "")), json!({"type": "number"}));
        assert_eq!(flag_schema(&FlagDescriptor::strings("a", "")), json!({"type": "array"}));
    }

    #[test]
    fn destructive_defaults_to_true() {
        assert!(is_destructive(&CommandNode::new("delete")));
        assert!(!is_destructive(&CommandNode::new("list").safe(true)));
        assert!(is_destructive(&CommandNode::new("list").safe(false)));
        assert!(!is_destructive(&CommandNode::new("create").destructive(false)));
        assert!(is_destructive(&CommandNode::new("close").destructive(true).safe(true)));
    }

    #[test]
    fn build_tool_has_fixed_parameters_and_visible_flags() {
        let node = CommandNode::new("list")
            .about("List issues")
            .flag(FlagDescriptor::number("per-page", "page size"))
            .flag(FlagDescriptor::string("token", "secret").hidden())
            .flag(FlagDescriptor::bool("help", "help"))
            .safe(true);
        let inherited = vec![
            FlagDescriptor::string("repo", "repository"),
            FlagDescriptor::string("per-page", "shadowed"),
        ];
        let tool = build_tool("labctl", &node, &path(&["issue", "list"]), &inherited);

        assert_eq!(tool.name, "labctl_issue_list");
        assert_eq!(tool.description, "List issues");
        assert!(!tool.destructive);

        let props = tool.input_schema["properties"].as_object().unwrap();
        let mut keys: Vec<&str> = props.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["args", "flags", "limit", "offset"]);
        assert_eq!(props["limit"]["default"], json!(50000));
        assert_eq!(props["offset"]["default"], json!(0));

        let flags = props["flags"]["properties"].as_object().unwrap();
        assert_eq!(flags.len(), 2);
        assert_eq!(flags["per_page"], json!({"type": "number"}));
        assert_eq!(flags["repo"], json!({"type": "string"}));
    }

    #[test]
    fn build_tool_without_flags_or_help() {
        let node = CommandNode::new("subscribe");
        let tool = build_tool("labctl", &node, &path(&["issue", "subscribe"]), &[]);
        assert_eq!(tool.description, "Execute issue subscribe");
        assert!(tool.destructive);
        let flags = &tool.input_schema["properties"]["flags"]["properties"];
        assert_eq!(flags, &json!({}));
    }
}
