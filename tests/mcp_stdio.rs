//! End-to-end: spawn `labctl mcp serve` and talk to it as an MCP client.

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};
use rmcp::{RoleClient, ServiceExt};
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::RunningService;
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use serde_json::{Value, json};
use tokio::process::Command;

async fn spawn_server(extra: &[&str]) -> Result<RunningService<RoleClient, ()>> {
    let service = ()
        .serve(TokioChildProcess::new(
            Command::new(env!("CARGO_BIN_EXE_labctl")).configure(|c| {
                c.arg("mcp").arg("serve");
                for a in extra {
                    c.arg(a);
                }
                c.env_remove("LABCTL_MCP_PREFIX");
                c.env_remove("LABCTL_MCP_CONFIG");
                c.stderr(std::process::Stdio::null());
            }),
        )?)
        .await?;
    Ok(service)
}

/// Upper bound for one whole test, so a server that stops answering fails the
/// test instead of hanging it.
const TEST_TIMEOUT: Duration = Duration::from_secs(30);

async fn within(test: impl Future<Output = Result<()>>) -> Result<()> {
    tokio::time::timeout(TEST_TIMEOUT, test)
        .await
        .map_err(|_| anyhow!("test did not finish within {TEST_TIMEOUT:?}"))?
}

fn arguments(v: Value) -> Option<serde_json::Map<String, Value>> {
    v.as_object().cloned()
}

fn text_of(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.clone()))
        .collect()
}

#[tokio::test]
async fn lists_leaf_commands_as_tools() -> Result<()> {
    within(async {
        let service = spawn_server(&["--exclude", "label.delete"]).await?;
        let tools = service.list_tools(Default::default()).await?;
        let names: Vec<&str> = tools.tools.iter().map(|t| &*t.name).collect();

        assert!(names.contains(&"labctl_issue_list"), "{names:?}");
        assert!(names.contains(&"labctl_mr_merge"));
        assert!(!names.contains(&"labctl_mcp_serve"));
        assert!(!names.contains(&"labctl_label_delete"));

        let merge = tools.tools.iter().find(|t| t.name == "labctl_mr_merge").unwrap();
        assert_eq!(
            merge.annotations.as_ref().and_then(|a| a.destructive_hint),
            Some(true)
        );

        let _ = service.cancel().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn call_runs_the_command_and_reports_pagination() -> Result<()> {
    within(async {
        let service = spawn_server(&["--subprocess"]).await?;
        let result = service
            .call_tool(CallToolRequestParam {
                name: "labctl_label_list".into(),
                arguments: arguments(json!({
                    "flags": {"repo": "group/project", "per_page": 5},
                })),
            })
            .await?;

        assert_eq!(result.is_error, Some(false));
        let text = text_of(&result);
        assert!(text.contains("/projects/group%2Fproject/labels"), "{text}");
        assert!(text.contains("\"per_page\": \"5\""), "{text}");

        let pagination = &result.structured_content.as_ref().unwrap()["pagination"];
        assert_eq!(pagination["total_size"], text.chars().count());
        assert_eq!(pagination["truncated"], false);

        let _ = service.cancel().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failing_command_returns_error_content() -> Result<()> {
    within(async {
        let service = spawn_server(&["--subprocess"]).await?;
        let result = service
            .call_tool(CallToolRequestParam {
                name: "labctl_issue_close".into(),
                arguments: arguments(json!({"args": ["12"]})),
            })
            .await?;

        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("no repository specified"));

        let _ = service.cancel().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn tail_offset_returns_the_end_of_the_output() -> Result<()> {
    within(async {
        let service = spawn_server(&[]).await?;
        let result = service
            .call_tool(CallToolRequestParam {
                name: "labctl_issue_view".into(),
                arguments: arguments(json!({
                    "args": ["#7"],
                    "flags": {"repo": "g/p"},
                    "limit": 2,
                    "offset": -2,
                })),
            })
            .await?;

        assert_eq!(result.is_error, Some(false));
        assert_eq!(text_of(&result), "}\n");
        let pagination = &result.structured_content.as_ref().unwrap()["pagination"];
        assert_eq!(pagination["truncated"], true);
        assert_eq!(pagination["actual_size"], 2);

        let _ = service.cancel().await;
        Ok(())
    })
    .await
}
