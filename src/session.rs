//! JSON-lines tool session over a reader/writer pair.
//!
//! Each input line is an invocation `{"name", "arguments"?, "tab"?}`. Each
//! output line is the outcome (`{"data"}` or `{"error"}`) plus the `content`
//! blocks to hand the model. Lines are handled strictly in order.

use pagepilot_browser::ToolDispatcher;
use pagepilot_protocols::{TabId, ToolContext, ToolInvocation, ToolOutcome};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Serve invocations until the input ends. Returns the number handled.
pub(crate) async fn run_session<R, W>(
    dispatcher: &ToolDispatcher,
    session_id: &str,
    input: R,
    mut output: W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;
    info!(session = session_id, "Session started");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = handle_line(dispatcher, session_id, line).await;
        output.write_all(reply.to_string().as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
        handled += 1;
    }

    info!(session = session_id, handled, "Session ended");
    Ok(handled)
}

async fn handle_line(dispatcher: &ToolDispatcher, session_id: &str, line: &str) -> Value {
    let (invocation, tab) = match parse_request(line) {
        Ok(request) => request,
        Err(message) => {
            debug!(error = %message, "Rejected session line");
            let outcome = ToolOutcome::error(message);
            return reply(&outcome, &outcome.to_text_content());
        }
    };

    let mut ctx = ToolContext::new(session_id);
    if let Some(tab) = tab {
        ctx = ctx.with_tab(tab);
    }
    let (outcome, content) = dispatcher.invoke_content(&invocation, ctx).await;
    reply(&outcome, &content)
}

fn parse_request(line: &str) -> Result<(ToolInvocation, Option<TabId>), String> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| format!("Invalid invocation: {}", e))?;
    let tab = value.get("tab").and_then(Value::as_str).map(TabId::new);
    let invocation: ToolInvocation =
        serde_json::from_value(value).map_err(|e| format!("Invalid invocation: {}", e))?;
    Ok((invocation, tab))
}

fn reply(outcome: &ToolOutcome, content: &[pagepilot_protocols::ContentBlock]) -> Value {
    let mut value = serde_json::to_value(outcome).unwrap_or_else(|_| json!({}));
    value["content"] = serde_json::to_value(content).unwrap_or_else(|_| json!([]));
    value
}
