// SPDX-License-Identifier: Apache-2.0

//! Cell-library indexing for technology mapping.
//!
//! [`build_index`] encodes every cell's behaviour as a multi-output truth
//! table, groups cells with identical tables, gathers groups into NPN
//! equivalence classes and decomposes each class function into shared
//! AND/XOR pattern graphs. The resulting [`CellLibrary`] is read-only and
//! can be persisted with [`codec::dump`] and [`codec::restore`].

pub mod cell;
pub mod class;
mod classify;
pub mod codec;
pub mod config;
pub mod error;
pub mod ids;
pub mod library;
pub mod logic;
pub mod npn;
mod patgen;
pub mod pattern;
pub mod signature;
pub mod summary;
pub mod test_utils;

pub use cell::{Cell, CellBuilder, CellKind, Pin, SeqSpec, Timing, TimingSense};
pub use class::{CellClass, CellGroup};
pub use config::BuildOptions;
pub use error::{Result, TechlibError};
pub use ids::{CellId, ClassId, EdgeId, GroupId, NodeId, PatternId};
pub use library::{build_index, BuildReport, CellLibrary};
pub use logic::{Expr, TruthTable};
pub use npn::NpnMap;
pub use pattern::{PatternGraph, PgNode};
pub use signature::{SeqPinInfo, Signature};
pub use summary::{display_library, LibrarySummary};
