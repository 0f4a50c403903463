pub mod bus;
pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod surface;
pub mod workbench;

pub use crate::bus::Bus;
pub use crate::config::LensConfig;
pub use crate::coordinator::{FilterCoordinator, FilterDispatch};
pub use crate::error::{LensError, LensResult};
pub use crate::event::{EvaluatorKind, LensEvent};
pub use crate::workbench::Workbench;
