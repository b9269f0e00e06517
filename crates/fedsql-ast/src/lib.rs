//! Expression trees for federated SQL resolution
//!
//! Parsing produces these nodes with element bindings, function signatures
//! and placeholder types left empty. Resolution fills them in place.

mod display;
mod expression;
mod operator;
mod symbol;

pub use expression::*;
pub use operator::{CompareOp, LogicalOp};
pub use symbol::{ElementBinding, ElementRef, GroupSymbol};
