// SPDX-License-Identifier: Apache-2.0

//! Dense integer ids into the library's tables.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                $name(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(CellId, "Cell");
define_id!(GroupId, "Group");
define_id!(ClassId, "Class");
define_id!(PatternId, "Pattern");
define_id!(
    /// Node of the shared pattern graph. Input nodes come first, so the node
    /// for pattern input `i` has id `i`.
    NodeId,
    "Node"
);
define_id!(
    /// Fanin slot of a pattern node: `node * 2 + position`.
    EdgeId,
    "Edge"
);

impl EdgeId {
    pub fn new(node: NodeId, pos: usize) -> Self {
        EdgeId(node.0 * 2 + pos as u32)
    }

    /// The node that consumes this edge.
    pub fn node(self) -> NodeId {
        NodeId(self.0 >> 1)
    }

    pub fn pos(self) -> usize {
        (self.0 & 1) as usize
    }
}
