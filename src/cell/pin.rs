// SPDX-License-Identifier: Apache-2.0

//! Cell pins.

use crate::logic::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputCaps {
    pub capacitance: f64,
    pub rise_capacitance: f64,
    pub fall_capacitance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutputLimits {
    pub max_fanout: f64,
    pub min_fanout: f64,
    pub max_capacitance: f64,
    pub min_capacitance: f64,
    pub max_transition: f64,
    pub min_transition: f64,
}

impl OutputLimits {
    pub(crate) fn to_array(self) -> [f64; 6] {
        [
            self.max_fanout,
            self.min_fanout,
            self.max_capacitance,
            self.min_capacitance,
            self.max_transition,
            self.min_transition,
        ]
    }

    pub(crate) fn from_array(v: [f64; 6]) -> Self {
        OutputLimits {
            max_fanout: v[0],
            min_fanout: v[1],
            max_capacitance: v[2],
            min_capacitance: v[3],
            max_transition: v[4],
            min_transition: v[5],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pin {
    Input {
        name: String,
        caps: InputCaps,
    },
    Output {
        name: String,
        function: Option<Expr>,
        three_state: Option<Expr>,
        limits: OutputLimits,
    },
    Inout {
        name: String,
        caps: InputCaps,
        function: Option<Expr>,
        three_state: Option<Expr>,
        limits: OutputLimits,
    },
    Internal {
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
    Inout,
    Internal,
}

impl Pin {
    pub fn name(&self) -> &str {
        match self {
            Pin::Input { name, .. }
            | Pin::Output { name, .. }
            | Pin::Inout { name, .. }
            | Pin::Internal { name } => name,
        }
    }

    pub fn direction(&self) -> PinDirection {
        match self {
            Pin::Input { .. } => PinDirection::Input,
            Pin::Output { .. } => PinDirection::Output,
            Pin::Inout { .. } => PinDirection::Inout,
            Pin::Internal { .. } => PinDirection::Internal,
        }
    }

    pub fn caps(&self) -> Option<&InputCaps> {
        match self {
            Pin::Input { caps, .. } | Pin::Inout { caps, .. } => Some(caps),
            _ => None,
        }
    }

    pub fn limits(&self) -> Option<&OutputLimits> {
        match self {
            Pin::Output { limits, .. } | Pin::Inout { limits, .. } => Some(limits),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<&Expr> {
        match self {
            Pin::Output { function, .. } | Pin::Inout { function, .. } => function.as_ref(),
            _ => None,
        }
    }

    pub fn three_state(&self) -> Option<&Expr> {
        match self {
            Pin::Output { three_state, .. } | Pin::Inout { three_state, .. } => {
                three_state.as_ref()
            }
            _ => None,
        }
    }
}
