/*!
Resource commands: issues, merge requests, labels.

The API client lives outside this crate, so every command renders the
request it would send (method, endpoint, query, body) as pretty JSON instead
of sending it. The request shape is what an API client would consume.

Layout:
  issue  list | view | create | close | subscribe
  mr     list | view | merge
  label  list | create | delete
*/

use std::io::Write;

use anyhow::{Result, bail};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::tree::{CommandNode, FlagDescriptor, ParsedArgs};

/// Request an API client would execute for one command.
#[derive(Debug, Serialize)]
pub struct ApiRequest {
    pub method: &'static str,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub query: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub body: Map<String, Value>,
}

impl ApiRequest {
    fn new(method: &'static str, endpoint: String) -> Self {
        Self {
            method,
            endpoint,
            query: Map::new(),
            body: Map::new(),
        }
    }

    fn query_str(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.query.insert(key.to_string(), Value::String(v.to_string()));
        }
        self
    }

    fn query_list(mut self, key: &str, values: &[String]) -> Self {
        if !values.is_empty() {
            self.query.insert(key.to_string(), Value::String(values.join(",")));
        }
        self
    }

    fn body_str(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.body.insert(key.to_string(), Value::String(v.to_string()));
        }
        self
    }

    fn body_value(mut self, key: &str, value: Value) -> Self {
        self.body.insert(key.to_string(), value);
        self
    }

    fn write(&self, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)?;
        Ok(())
    }
}

/* ---- Helpers ---- */

fn project(args: &ParsedArgs) -> Result<String> {
    match args.value("repo").map(str::trim).filter(|r| !r.is_empty()) {
        Some(repo) => Ok(format!("/projects/{}", repo.replace('/', "%2F"))),
        None => bail!("no repository specified (use -R/--repo OWNER/REPO)"),
    }
}

/// First positional as a numeric id (issue / merge request iid).
fn iid(args: &ParsedArgs, what: &str) -> Result<u64> {
    let raw = args
        .positional(0)
        .ok_or_else(|| anyhow::anyhow!("missing {what} id argument"))?;
    raw.trim_start_matches('#')
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("invalid {what} id: '{raw}'"))
}

fn per_page(args: &ParsedArgs) -> Option<&str> {
    args.value("per-page")
}

fn state_filter(args: &ParsedArgs) -> Option<&'static str> {
    if args.flag("all") {
        Some("all")
    } else if args.flag("closed") {
        Some("closed")
    } else {
        None
    }
}

fn id_from_flag(args: &ParsedArgs, name: &str) -> Option<Value> {
    args.value(name)
        .and_then(|v| v.parse::<i64>().ok())
        .map(|n| Value::Number(n.into()))
}

/* ---- issue ---- */

fn issue_list(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    ApiRequest::new("GET", format!("{}/issues", project(args)?))
        .query_str("state", state_filter(args).or(Some("opened")))
        .query_list("labels", args.values("label"))
        .query_str("assignee_username", args.value("assignee"))
        .query_str("search", args.value("search"))
        .query_str("per_page", per_page(args))
        .write(out)
}

fn issue_view(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let id = iid(args, "issue")?;
    let mut req = ApiRequest::new("GET", format!("{}/issues/{id}", project(args)?));
    if args.flag("comments") {
        req = req.query_str("include", Some("notes"));
    }
    req.write(out)
}

fn issue_create(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let title = args
        .value("title")
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("--title is required"))?;
    let mut req = ApiRequest::new("POST", format!("{}/issues", project(args)?))
        .body_str("title", Some(title))
        .body_str("description", args.value("description"));
    if !args.values("label").is_empty() {
        req = req.body_value("labels", Value::String(args.values("label").join(",")));
    }
    if let Some(weight) = id_from_flag(args, "weight") {
        req = req.body_value("weight", weight);
    }
    if args.flag("confidential") {
        req = req.body_value("confidential", Value::Bool(true));
    }
    req.write(out)
}

fn issue_close(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let id = iid(args, "issue")?;
    ApiRequest::new("PUT", format!("{}/issues/{id}", project(args)?))
        .body_str("state_event", Some("close"))
        .write(out)
}

fn issue_subscribe(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let id = iid(args, "issue")?;
    ApiRequest::new("POST", format!("{}/issues/{id}/subscribe", project(args)?)).write(out)
}

fn issue_node() -> CommandNode {
    CommandNode::new("issue")
        .about("Work with issues")
        .child(
            CommandNode::new("list")
                .about("List project issues")
                .long_about(
                    "List issues of the current project. Defaults to open issues; \
                     use --closed or --all to widen the state filter, and --label \
                     (repeatable) to filter by label.",
                )
                .flag(FlagDescriptor::bool("all", "Include issues in any state").short('A'))
                .flag(FlagDescriptor::bool("closed", "Only closed issues").short('c'))
                .flag(FlagDescriptor::strings("label", "Filter by label (repeatable)").short('l'))
                .flag(FlagDescriptor::string("assignee", "Filter by assignee username").short('a'))
                .flag(FlagDescriptor::string("search", "Search in title and description"))
                .flag(FlagDescriptor::number("per-page", "Number of items per page").short('P'))
                .safe(true)
                .action(issue_list),
        )
        .child(
            CommandNode::new("view")
                .about("Show a single issue")
                .flag(FlagDescriptor::bool("comments", "Include comments").short('c'))
                .safe(true)
                .action(issue_view),
        )
        .child(
            CommandNode::new("create")
                .about("Create an issue")
                .flag(FlagDescriptor::string("title", "Issue title").short('t'))
                .flag(FlagDescriptor::string("description", "Issue description").short('d'))
                .flag(FlagDescriptor::strings("label", "Label to apply (repeatable)").short('l'))
                .flag(FlagDescriptor::number("weight", "Issue weight").short('w'))
                .flag(FlagDescriptor::bool("confidential", "Mark as confidential"))
                .destructive(false)
                .action(issue_create),
        )
        .child(
            CommandNode::new("close")
                .about("Close an issue")
                .destructive(true)
                .action(issue_close),
        )
        .child(
            CommandNode::new("subscribe")
                .about("Subscribe to issue notifications")
                .action(issue_subscribe),
        )
}

/* ---- mr ---- */

fn mr_list(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    ApiRequest::new("GET", format!("{}/merge_requests", project(args)?))
        .query_str("state", state_filter(args).or(Some("opened")))
        .query_str("target_branch", args.value("target-branch"))
        .query_list("labels", args.values("label"))
        .query_str("per_page", per_page(args))
        .write(out)
}

fn mr_view(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let id = iid(args, "merge request")?;
    ApiRequest::new("GET", format!("{}/merge_requests/{id}", project(args)?)).write(out)
}

fn mr_merge(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let id = iid(args, "merge request")?;
    let mut req = ApiRequest::new("PUT", format!("{}/merge_requests/{id}/merge", project(args)?))
        .body_str("merge_commit_message", args.value("message"));
    if args.flag("squash") {
        req = req.body_value("squash", Value::Bool(true));
    }
    if args.flag("remove-source-branch") {
        req = req.body_value("should_remove_source_branch", Value::Bool(true));
    }
    req.write(out)
}

fn mr_node() -> CommandNode {
    CommandNode::new("mr")
        .about("Work with merge requests")
        .child(
            CommandNode::new("list")
                .about("List merge requests")
                .flag(FlagDescriptor::bool("all", "Include merge requests in any state").short('A'))
                .flag(FlagDescriptor::bool("closed", "Only closed merge requests").short('c'))
                .flag(FlagDescriptor::string("target-branch", "Filter by target branch").short('t'))
                .flag(FlagDescriptor::strings("label", "Filter by label (repeatable)").short('l'))
                .flag(FlagDescriptor::number("per-page", "Number of items per page").short('P'))
                .safe(true)
                .action(mr_list),
        )
        .child(
            CommandNode::new("view")
                .about("Show a single merge request")
                .safe(true)
                .action(mr_view),
        )
        .child(
            CommandNode::new("merge")
                .about("Merge a merge request")
                .flag(FlagDescriptor::string("message", "Custom merge commit message").short('m'))
                .flag(FlagDescriptor::bool("squash", "Squash commits on merge").short('s'))
                .flag(FlagDescriptor::bool("remove-source-branch", "Remove source branch after merge").short('d'))
                .destructive(true)
                .action(mr_merge),
        )
}

/* ---- label ---- */

fn label_list(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    ApiRequest::new("GET", format!("{}/labels", project(args)?))
        .query_str("search", args.value("search"))
        .query_str("per_page", per_page(args))
        .write(out)
}

fn label_create(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let name = args
        .value("name")
        .or_else(|| args.positional(0))
        .ok_or_else(|| anyhow::anyhow!("label name is required (--name or first argument)"))?;
    ApiRequest::new("POST", format!("{}/labels", project(args)?))
        .body_str("name", Some(name))
        .body_str("color", args.value("color").or(Some("#428BCA")))
        .body_str("description", args.value("description"))
        .write(out)
}

fn label_delete(args: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let name = args
        .positional(0)
        .ok_or_else(|| anyhow::anyhow!("missing label name argument"))?;
    ApiRequest::new("DELETE", format!("{}/labels/{name}", project(args)?)).write(out)
}

fn label_node() -> CommandNode {
    CommandNode::new("label")
        .about("Manage project labels")
        .child(
            CommandNode::new("list")
                .about("List labels")
                .flag(FlagDescriptor::string("search", "Filter labels by keyword"))
                .flag(FlagDescriptor::number("per-page", "Number of items per page").short('P'))
                .safe(true)
                .action(label_list),
        )
        .child(
            CommandNode::new("create")
                .about("Create a label")
                .flag(FlagDescriptor::string("name", "Label name").short('n'))
                .flag(FlagDescriptor::string("color", "Label color as #RRGGBB").short('c'))
                .flag(FlagDescriptor::string("description", "Label description").short('d'))
                .destructive(false)
                .action(label_create),
        )
        .child(
            CommandNode::new("delete")
                .about("Delete a label")
                .action(label_delete),
        )
}

/// All resource command groups, in help order.
pub fn resource_nodes() -> Vec<CommandNode> {
    vec![issue_node(), mr_node(), label_node()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::FlagValue;

    fn args(flags: &[(&str, FlagValue)], positionals: &[&str]) -> ParsedArgs {
        let mut parsed = ParsedArgs::default();
        parsed
            .flags
            .insert("repo".into(), FlagValue::Str("group/project".into()));
        for (k, v) in flags {
            parsed.flags.insert(k.to_string(), v.clone());
        }
        parsed.positionals = positionals.iter().map(|s| s.to_string()).collect();
        parsed
    }

    fn render(f: fn(&ParsedArgs, &mut dyn Write) -> Result<()>, parsed: &ParsedArgs) -> Value {
        let mut buf: Vec<u8> = Vec::new();
        f(parsed, &mut buf).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn issue_list_renders_filters() {
        let parsed = args(
            &[
                ("closed", FlagValue::Bool(true)),
                ("label", FlagValue::Many(vec!["bug".into(), "ui".into()])),
                ("per-page", FlagValue::Str("20".into())),
            ],
            &[],
        );
        let req = render(issue_list, &parsed);
        assert_eq!(req["method"], "GET");
        assert_eq!(req["endpoint"], "/projects/group%2Fproject/issues");
        assert_eq!(req["query"]["state"], "closed");
        assert_eq!(req["query"]["labels"], "bug,ui");
        assert_eq!(req["query"]["per_page"], "20");
    }

    #[test]
    fn issue_close_needs_numeric_id() {
        let parsed = args(&[], &["#12"]);
        let req = render(issue_close, &parsed);
        assert_eq!(req["method"], "PUT");
        assert_eq!(req["endpoint"], "/projects/group%2Fproject/issues/12");
        assert_eq!(req["body"]["state_event"], "close");

        let bad = args(&[], &["twelve"]);
        let mut buf: Vec<u8> = Vec::new();
        let err = issue_close(&bad, &mut buf).unwrap_err();
        assert!(err.to_string().contains("invalid issue id"));
    }

    #[test]
    fn missing_repo_is_an_error() {
        let mut parsed = args(&[], &[]);
        parsed.flags.remove("repo");
        let mut buf: Vec<u8> = Vec::new();
        let err = label_list(&parsed, &mut buf).unwrap_err();
        assert!(err.to_string().contains("no repository"));
    }

    #[test]
    fn label_create_accepts_positional_name() {
        let parsed = args(&[], &["needs-triage"]);
        let req = render(label_create, &parsed);
        assert_eq!(req["body"]["name"], "needs-triage");
        assert_eq!(req["body"]["color"], "#428BCA");
    }

    #[test]
    fn every_resource_leaf_is_runnable() {
        for group in resource_nodes() {
            assert!(!group.is_runnable(), "{} should be a group", group.name);
            assert!(group.children.iter().all(CommandNode::is_runnable));
        }
    }
}
