use serde::Serialize;

/// Which filter path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    Expression,
    Query,
}

impl EvaluatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatorKind::Expression => "expression",
            EvaluatorKind::Query => "query",
        }
    }
}

/// Outcome notifications published by the coordinator.
///
/// Every `run_filter` call produces exactly one of the `Filter*` variants,
/// tagged with the run id it was issued for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LensEvent {
    /// The editor text parsed and replaced the current document.
    InputValid,
    FilterEmpty {
        run_id: u64,
    },
    FilterValid {
        run_id: u64,
        result: serde_json::Value,
        kind: EvaluatorKind,
    },
    FilterInvalid {
        run_id: u64,
    },
}

impl LensEvent {
    /// Run id for filter outcomes, `None` for document events.
    pub fn run_id(&self) -> Option<u64> {
        match self {
            LensEvent::InputValid => None,
            LensEvent::FilterEmpty { run_id }
            | LensEvent::FilterValid { run_id, .. }
            | LensEvent::FilterInvalid { run_id } => Some(*run_id),
        }
    }

    pub fn is_filter_outcome(&self) -> bool {
        self.run_id().is_some()
    }
}
