use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;

use crate::error::{LensError, LensResult};

const MAX_CALL_LEVELS: usize = 32;
const MAX_EXPR_DEPTH: usize = 64;
const MAX_FUNCTION_EXPR_DEPTH: usize = 32;
const MAX_STRING_SIZE: usize = 1 << 20;
const MAX_COLLECTION_SIZE: usize = 100_000;

/// Evaluates a short expression with a single variable bound to the document.
///
/// `Ok(None)` means the expression ran but produced nothing (an undefined
/// property, an assignment). Any evaluation problem is an `Err`.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, variable: &str, document: &Value, source: &str)
        -> LensResult<Option<Value>>;
}

/// Rhai-backed sandbox. Scripts see only the bound variable, run under an
/// operation budget and cannot print, `eval`, or reach host state.
pub struct RhaiEvaluator {
    engine: Engine,
}

impl std::fmt::Debug for RhaiEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiEvaluator").finish()
    }
}

impl RhaiEvaluator {
    pub fn new(max_operations: u64) -> Self {
        let mut engine = Engine::new();
        engine
            .set_max_operations(max_operations)
            .set_max_call_levels(MAX_CALL_LEVELS)
            .set_max_expr_depths(MAX_EXPR_DEPTH, MAX_FUNCTION_EXPR_DEPTH)
            .set_max_string_size(MAX_STRING_SIZE)
            .set_max_array_size(MAX_COLLECTION_SIZE)
            .set_max_map_size(MAX_COLLECTION_SIZE);
        engine.disable_symbol("eval");
        engine.on_print(|_| {});
        engine.on_debug(|_, _, _| {});
        Self { engine }
    }
}

impl ExpressionEvaluator for RhaiEvaluator {
    fn evaluate(
        &self,
        variable: &str,
        document: &Value,
        source: &str,
    ) -> LensResult<Option<Value>> {
        let bound = rhai::serde::to_dynamic(document)
            .map_err(|error| LensError::Expression(format!("failed to bind document: {error}")))?;
        let mut scope = Scope::new();
        scope.push_dynamic(variable, bound);

        let result: Dynamic = self
            .engine
            .eval_with_scope(&mut scope, source)
            .map_err(|error| LensError::Expression(error.to_string()))?;
        if result.is_unit() {
            return Ok(None);
        }

        let value: Value = rhai::serde::from_dynamic(&result).map_err(|error| {
            LensError::Expression(format!("result is not representable as JSON: {error}"))
        })?;
        Ok(Some(value))
    }
}
