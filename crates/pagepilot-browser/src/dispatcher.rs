//! Tool dispatch.
//!
//! The dispatcher is the only entry point for the LLM loop. It looks up the
//! tool, resolves the tab the call acts on, serializes calls per tab and
//! folds every failure, panics included, into a [`ToolOutcome`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::FutureExt;
use pagepilot_protocols::{
    panic_message, ContentBlock, TabId, Tool, ToolContext, ToolDefinition, ToolError,
    ToolInvocation, ToolOutcome,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::BrowserError;
use crate::host::TabHost;
use crate::registry::ToolRegistry;
use crate::tools::default_tools;

pub struct ToolDispatcher {
    host: Arc<dyn TabHost>,
    registry: ToolRegistry,
    tab_locks: DashMap<TabId, Arc<Mutex<()>>>,
}

impl ToolDispatcher {
    /// A dispatcher with no tools registered.
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            host,
            registry: ToolRegistry::new(),
            tab_locks: DashMap::new(),
        }
    }

    /// A dispatcher with the full catalog.
    pub fn with_default_tools(
        host: Arc<dyn TabHost>,
        navigation_timeout: Duration,
    ) -> Result<Self, BrowserError> {
        let dispatcher = Self::new(host.clone());
        for tool in default_tools(host, navigation_timeout) {
            dispatcher.register(tool)?;
        }
        Ok(dispatcher)
    }

    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), BrowserError> {
        self.registry.register(tool)
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    pub fn host(&self) -> &Arc<dyn TabHost> {
        &self.host
    }

    /// Run one invocation.
    pub async fn invoke(&self, invocation: &ToolInvocation, ctx: ToolContext) -> ToolOutcome {
        self.invoke_with(invocation, ctx).await.0
    }

    /// Run one invocation and project the outcome into content blocks.
    pub async fn invoke_content(
        &self,
        invocation: &ToolInvocation,
        ctx: ToolContext,
    ) -> (ToolOutcome, Vec<ContentBlock>) {
        let (outcome, tool) = self.invoke_with(invocation, ctx).await;
        let content = match tool {
            Some(tool) => tool.to_result_content(&outcome),
            None => outcome.to_text_content(),
        };
        (outcome, content)
    }

    async fn invoke_with(
        &self,
        invocation: &ToolInvocation,
        ctx: ToolContext,
    ) -> (ToolOutcome, Option<Arc<dyn Tool>>) {
        let Some(tool) = self.registry.get(&invocation.name) else {
            warn!(tool = %invocation.name, "Unknown tool");
            let err = ToolError::NotFound(invocation.name.clone());
            return (ToolOutcome::from_result(Err(err)), None);
        };

        let started = Instant::now();
        let correlation_id = ctx.correlation_id.clone();
        debug!(tool = %invocation.name, correlation_id = %correlation_id, "Invoking tool");

        let result = self.dispatch(tool.as_ref(), invocation, ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(tool = %invocation.name, correlation_id = %correlation_id, elapsed_ms, "Tool succeeded"),
            Err(e) => warn!(tool = %invocation.name, correlation_id = %correlation_id, elapsed_ms, class = ?e.class(), error = %e, "Tool failed"),
        }
        (ToolOutcome::from_result(result), Some(tool))
    }

    async fn dispatch(
        &self,
        tool: &dyn Tool,
        invocation: &ToolInvocation,
        ctx: ToolContext,
    ) -> Result<String, ToolError> {
        tool.validate(&invocation.arguments)?;
        let arguments = invocation.arguments.clone();

        if !tool.targets_tab() {
            return run(tool, arguments, ctx).await;
        }

        let tab = self.target_tab(&ctx).await?;
        let lock = self.tab_lock(&tab);
        let result = {
            let _guard = lock.lock().await;
            run(tool, arguments, ctx.with_tab(tab)).await
        };
        drop(lock);
        self.prune_tab_locks();
        result
    }

    async fn target_tab(&self, ctx: &ToolContext) -> Result<TabId, ToolError> {
        match &ctx.target_tab {
            Some(id) => Ok(self.host.tab(id).await?.id),
            None => self
                .host
                .active_tab()
                .await?
                .map(|tab| tab.id)
                .ok_or(ToolError::NoActiveTab),
        }
    }

    fn tab_lock(&self, tab: &TabId) -> Arc<Mutex<()>> {
        self.tab_locks
            .entry(tab.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop locks no call holds or waits on, so tabs closed outside
    /// `close_tab` do not pile up.
    fn prune_tab_locks(&self) {
        self.tab_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Tabs with a live lock.
    pub fn locked_tab_count(&self) -> usize {
        self.tab_locks.len()
    }
}

async fn run(tool: &dyn Tool, arguments: Value, ctx: ToolContext) -> Result<String, ToolError> {
    AssertUnwindSafe(tool.execute(arguments, ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(ToolError::ExecutionFailed(format!(
                "Tool panicked: {}",
                panic_message(panic.as_ref())
            )))
        })
}
