// SPDX-License-Identifier: Apache-2.0

//! Timing arcs and the sense-keyed arc table.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimingSense {
    PositiveUnate,
    NegativeUnate,
}

impl TimingSense {
    /// Tag used in the binary index; 0 terminates an arc stream.
    pub fn tag(self) -> u8 {
        match self {
            TimingSense::PositiveUnate => 1,
            TimingSense::NegativeUnate => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(TimingSense::PositiveUnate),
            2 => Some(TimingSense::NegativeUnate),
            _ => None,
        }
    }
}

/// Generic (linear model) timing parameters of one arc.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timing {
    pub intrinsic_rise: f64,
    pub intrinsic_fall: f64,
    pub slope_rise: f64,
    pub slope_fall: f64,
    pub rise_resistance: f64,
    pub fall_resistance: f64,
}

impl Timing {
    pub(crate) fn to_array(self) -> [f64; 6] {
        [
            self.intrinsic_rise,
            self.intrinsic_fall,
            self.slope_rise,
            self.slope_fall,
            self.rise_resistance,
            self.fall_resistance,
        ]
    }

    pub(crate) fn from_array(v: [f64; 6]) -> Self {
        Timing {
            intrinsic_rise: v[0],
            intrinsic_fall: v[1],
            slope_rise: v[2],
            slope_fall: v[3],
            rise_resistance: v[4],
            fall_resistance: v[5],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimingKey {
    pub input: u32,
    pub output: u32,
    pub sense: TimingSense,
}

/// Maps (input position, output position, sense) to indices into a cell's arc
/// list. Several arcs may share a key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimingTable {
    map: BTreeMap<TimingKey, Vec<u32>>,
}

impl TimingTable {
    pub fn insert(&mut self, key: TimingKey, arc: u32) {
        self.map.entry(key).or_default().push(arc);
    }

    pub fn get(&self, key: &TimingKey) -> &[u32] {
        self.map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All `(key, arc)` pairs in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&TimingKey, u32)> + '_ {
        self.map
            .iter()
            .flat_map(|(k, arcs)| arcs.iter().map(move |&a| (k, a)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &TimingKey> + '_ {
        self.map.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_empty() {
        let mut t = TimingTable::default();
        let key = TimingKey {
            input: 0,
            output: 0,
            sense: TimingSense::PositiveUnate,
        };
        t.insert(key, 0);
        t.insert(key, 3);
        assert_eq!(t.get(&key), &[0, 3]);
        let other = TimingKey {
            sense: TimingSense::NegativeUnate,
            ..key
        };
        assert!(t.get(&other).is_empty());
        assert_eq!(t.entries().count(), 2);
    }

    #[test]
    fn test_sense_tags_skip_terminator() {
        for s in [TimingSense::PositiveUnate, TimingSense::NegativeUnate] {
            assert_ne!(s.tag(), 0);
            assert_eq!(TimingSense::from_tag(s.tag()), Some(s));
        }
        assert_eq!(TimingSense::from_tag(0), None);
    }
}
