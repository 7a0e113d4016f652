//! Operation catalog: the single table of what each operation does to which account.
//!
//! This module implements:
//! - The closed set of operation types
//! - Delta rules (fixed or caller supplied) and side effects per operation
//! - Configuration overrides of fixed deltas
//! - Funds conversion-rate scaling

pub mod conversion;
pub mod operation;
pub mod table;

pub use conversion::{ConversionRate, ConversionRateProvider};
pub use operation::OperationType;
pub use table::{DeltaRule, OperationCatalog, OperationSpec, Sign, SideEffect};
