// SPDX-License-Identifier: Apache-2.0

//! Cell groups and NPN classes.

use crate::ids::{CellId, ClassId, GroupId, PatternId};
use crate::npn::NpnMap;
use crate::signature::{SeqPinInfo, Signature};

/// Cells sharing one exact signature.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGroup {
    pub(crate) id: GroupId,
    pub(crate) class_id: ClassId,
    pub(crate) map: NpnMap,
    pub(crate) signature: Signature,
    pub(crate) cells: Vec<CellId>,
    pub(crate) seq_pin_info: Option<SeqPinInfo>,
}

impl CellGroup {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Map taking the class representative to this group's signature.
    pub fn map(&self) -> &NpnMap {
        &self.map
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    pub fn seq_pin_info(&self) -> Option<SeqPinInfo> {
        self.seq_pin_info
    }
}

/// An NPN equivalence class.
#[derive(Debug, Clone, PartialEq)]
pub struct CellClass {
    pub(crate) id: ClassId,
    pub(crate) repr: Signature,
    pub(crate) automorphisms: Vec<NpnMap>,
    pub(crate) groups: Vec<GroupId>,
    pub(crate) patterns: Vec<PatternId>,
}

impl CellClass {
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Canonical representative signature.
    pub fn repr(&self) -> &Signature {
        &self.repr
    }

    /// Non-identity maps taking the representative to itself.
    pub fn automorphisms(&self) -> &[NpnMap] {
        &self.automorphisms
    }

    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    pub fn patterns(&self) -> &[PatternId] {
        &self.patterns
    }
}

pub const CONST0: usize = 0;
pub const CONST1: usize = 1;
pub const BUF: usize = 2;
pub const INV: usize = 3;

/// Slot of a simple flip-flop or latch shape.
pub fn seq_shape_index(has_clear: bool, has_preset: bool) -> usize {
    has_clear as usize + 2 * has_preset as usize
}

/// Ids of the classes and groups seeded before any library cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtins {
    /// Groups of const0, const1, buffer and inverter, in that order.
    pub logic_groups: [GroupId; 4],
    /// Flip-flop classes indexed by [`seq_shape_index`].
    pub ff_classes: [ClassId; 4],
    /// Latch classes indexed by [`seq_shape_index`].
    pub latch_classes: [ClassId; 4],
}
