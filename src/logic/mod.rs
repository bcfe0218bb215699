// SPDX-License-Identifier: Apache-2.0

pub mod expr;
pub mod truth_table;

pub use expr::{Expr, MAX_EXPR_DEPTH};
pub use truth_table::TruthTable;
