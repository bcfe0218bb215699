// SPDX-License-Identifier: Apache-2.0

//! Bit-exact persistence of a [`CellLibrary`](crate::CellLibrary).
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! name, u32 cell count, cells...
//! u32 class count, u32 group count
//! groups:  u32 class, map, u32 n + n cell ids
//! classes: u32 n + n automorphism maps, u32 n + n group ids
//! built-ins: 4 logic group ids, 4 flip-flop class ids, 4 latch class ids
//! u32 node count, per node: u32 (input_id << 2 | type), u32 fanin0, u32 fanin1
//! u32 pattern count, per pattern: u32 (inputs << 1 | root_inv),
//!     u32 n + n edge ids, u32 class id
//! ```
//!
//! Signatures, class representatives, sequential pin info, the name index and
//! the class pattern lists are not stored; `restore` derives them again and
//! checks them against the stored maps.

mod bin_io;
mod dump;
mod restore;

pub use dump::dump;
pub use restore::{restore, restore_from_bytes};

use crate::logic::Expr;

pub(crate) const EXPR_ZERO: u8 = 0;
pub(crate) const EXPR_ONE: u8 = 1;
pub(crate) const EXPR_POSI: u8 = 2;
pub(crate) const EXPR_NEGA: u8 = 3;
pub(crate) const EXPR_AND: u8 = 4;
pub(crate) const EXPR_OR: u8 = 5;
pub(crate) const EXPR_XOR: u8 = 6;

/// Output has a logic function.
pub(crate) const HAS_LOGIC: u8 = 1;
/// Output has a three-state condition.
pub(crate) const HAS_TRISTATE: u8 = 2;

pub(crate) fn expr_tag(e: &Expr) -> u8 {
    match e {
        Expr::Zero => EXPR_ZERO,
        Expr::One => EXPR_ONE,
        Expr::Literal { negated: false, .. } => EXPR_POSI,
        Expr::Literal { negated: true, .. } => EXPR_NEGA,
        Expr::And(_) => EXPR_AND,
        Expr::Or(_) => EXPR_OR,
        Expr::Xor(_) => EXPR_XOR,
    }
}
