//! The document filter coordinator.
//!
//! Owns the parsed document behind the editor and turns filter requests into
//! outcome events. Filters are tried as a sandboxed expression first and fall
//! back to the query language when the expression cannot be evaluated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::bus::Bus;
use crate::config::LensConfig;
use crate::document::{format_document, DocumentParser, Json5Parser};
use crate::evaluator::{is_truthy, ExpressionEvaluator, JqProcess, QueryEvaluator, RhaiEvaluator};
use crate::event::{EvaluatorKind, LensEvent};
use crate::surface::{EditorSurface, FilterInputSurface};


/// What `run_filter` did with a request.
#[derive(Debug)]
pub enum FilterDispatch {
    /// The outcome was decided and published before returning.
    Settled(LensEvent),
    /// The query fallback is running; its outcome is published when the
    /// task completes.
    Pending { run_id: u64, handle: JoinHandle<()> },
}

impl FilterDispatch {
    pub fn run_id(&self) -> u64 {
        match self {
            FilterDispatch::Settled(event) => event.run_id().unwrap_or_default(),
            FilterDispatch::Pending { run_id, .. } => *run_id,
        }
    }

    /// Wait for a pending query to publish its outcome.
    pub async fn finished(self) {
        if let FilterDispatch::Pending { run_id, handle } = self {
            if let Err(error) = handle.await {
                tracing::warn!(run_id, "query outcome task failed: {error}");
            }
        }
    }
}

pub struct FilterCoordinator {
    editor: Arc<dyn EditorSurface>,
    filter_input: Arc<dyn FilterInputSurface>,
    parser: Arc<dyn DocumentParser>,
    expression: Arc<dyn ExpressionEvaluator>,
    query: Arc<dyn QueryEvaluator>,
    bus: Bus,
    variable: String,
    indent: usize,
    document: RwLock<Option<Value>>,
    next_run_id: AtomicU64,
}

impl std::fmt::Debug for FilterCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCoordinator")
            .field("variable", &self.variable)
            .field("indent", &self.indent)
            .field("has_document", &self.document.read().is_some())
            .finish()
    }
}

impl FilterCoordinator {
    /// Coordinator with the default collaborators for `config`.
    pub fn new(
        editor: Arc<dyn EditorSurface>,
        filter_input: Arc<dyn FilterInputSurface>,
        bus: Bus,
        config: &LensConfig,
    ) -> Self {
        Self {
            editor,
            filter_input,
            parser: Arc::new(Json5Parser),
            expression: Arc::new(RhaiEvaluator::new(config.filter.max_operations)),
            query: Arc::new(JqProcess::from_preferences(&config.filter)),
            bus,
            variable: config.filter.variable.clone(),
            indent: config.editor.indent,
            document: RwLock::new(None),
            next_run_id: AtomicU64::new(1),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_expression_evaluator(mut self, expression: Arc<dyn ExpressionEvaluator>) -> Self {
        self.expression = expression;
        self
    }

    pub fn with_query_evaluator(mut self, query: Arc<dyn QueryEvaluator>) -> Self {
        self.query = query;
        self
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Snapshot of the current document, `None` after a failed parse.
    pub fn document(&self) -> Option<Value> {
        self.document.read().clone()
    }

    /// Parse the editor text into the document.
    ///
    /// On failure the document becomes absent and nothing is published.
    pub fn validate(&self) -> bool {
        let text = self.editor.get_value();
        match self.parser.parse(&text) {
            Ok(document) => {
                *self.document.write() = Some(document);
                self.bus.publish(LensEvent::InputValid);
                true
            }
            Err(error) => {
                *self.document.write() = None;
                tracing::debug!("editor text rejected: {error}");
                false
            }
        }
    }

    /// Rewrite the editor with the indented document. Returns whether the
    /// editor was touched.
    pub fn format_input(&self) -> bool {
        let Some(document) = self.document() else {
            return false;
        };
        match format_document(&document, self.indent) {
            Ok(text) => {
                self.editor.set_value(&text);
                true
            }
            Err(error) => {
                tracing::warn!("format skipped: {error}");
                false
            }
        }
    }

    /// Evaluate the filter input against the current document and publish
    /// exactly one outcome for this run.
    pub fn run_filter(&self) -> FilterDispatch {
        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let filter = self.filter_input.value();
        if filter.trim().is_empty() {
            return self.settle(LensEvent::FilterEmpty { run_id });
        }

        let Some(document) = self.document() else {
            tracing::debug!(run_id, "no valid document to filter");
            return self.settle(LensEvent::FilterInvalid { run_id });
        };

        let source = format!("{}{}", self.variable, filter);
        match self.expression.evaluate(&self.variable, &document, &source) {
            Ok(Some(result)) if is_truthy(&result) => self.settle(LensEvent::FilterValid {
                run_id,
                result,
                kind: EvaluatorKind::Expression,
            }),
            Ok(_) => self.settle(LensEvent::FilterInvalid { run_id }),
            Err(error) => {
                tracing::debug!(run_id, "expression failed, trying query: {error}");
                self.spawn_query(run_id, filter, document)
            }
        }
    }

    fn settle(&self, event: LensEvent) -> FilterDispatch {
        self.bus.publish(event.clone());
        FilterDispatch::Settled(event)
    }

    fn spawn_query(&self, run_id: u64, filter: String, document: Value) -> FilterDispatch {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(run_id, "no async runtime available for the query fallback");
            return self.settle(LensEvent::FilterInvalid { run_id });
        };

        let query = Arc::clone(&self.query);
        let bus = self.bus.clone();
        let handle = runtime.spawn(async move {
            // The evaluation runs in its own task so a panic inside the
            // evaluator still ends in an outcome.
            let evaluation = tokio::spawn(async move { query.run(&filter, &document).await });
            let event = match evaluation.await {
                Ok(Ok(Some(result))) => LensEvent::FilterValid {
                    run_id,
                    result,
                    kind: EvaluatorKind::Query,
                },
                Ok(Ok(None)) => LensEvent::FilterInvalid { run_id },
                Ok(Err(error)) => {
                    tracing::warn!(run_id, "query failed: {error}");
                    LensEvent::FilterInvalid { run_id }
                }
                Err(error) => {
                    tracing::warn!(run_id, "query task aborted: {error}");
                    LensEvent::FilterInvalid { run_id }
                }
            };
            bus.publish(event);
        });

        FilterDispatch::Pending { run_id, handle }
    }
}
