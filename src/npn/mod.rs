// SPDX-License-Identifier: Apache-2.0

//! NPN maps and the search for maps between signatures.

pub mod map;
pub mod matcher;

pub use map::{InputMap, NpnMap};
