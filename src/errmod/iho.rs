//! Depth-only uncertainty envelope from the IHO S-44 survey orders
//!
//! Uses the 4th edition (1998) Table 1 tolerances. The model ignores platform
//! motion and beam geometry entirely, so it is only appropriate when no
//! trustworthy attitude or offset information is available.

use serde::{Deserialize, Serialize};

use crate::core::{Sounding, CI95_SCALE};
use crate::error::{ErrModError, Result};

/// Survey order, 1 being the most stringent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum IhoOrder {
    /// Special order: harbours, berthing areas and critical channels
    Order1 = 1,
    /// Harbour approaches and coastal areas to 100 m
    Order2 = 2,
    /// Areas not covered by the first two orders, to 200 m
    Order3 = 3,
    /// Offshore areas not covered by other orders
    Order4 = 4,
}

impl TryFrom<u32> for IhoOrder {
    type Error = ErrModError;

    fn try_from(order: u32) -> Result<Self> {
        match order {
            1 => Ok(IhoOrder::Order1),
            2 => Ok(IhoOrder::Order2),
            3 => Ok(IhoOrder::Order3),
            4 => Ok(IhoOrder::Order4),
            _ => Err(ErrModError::UnknownOrder(order)),
        }
    }
}

impl From<IhoOrder> for u32 {
    fn from(order: IhoOrder) -> u32 {
        order as u32
    }
}

impl Default for IhoOrder {
    fn default() -> Self {
        IhoOrder::Order1
    }
}

/// 95% confidence tolerances for one survey order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IhoLimits {
    /// Depth-independent sounding error (meters)
    pub sounding_fixed: f64,
    /// Depth-proportional sounding error (fraction of depth)
    pub sounding_pct: f64,
    /// Depth-independent DTM error (meters)
    pub dtm_fixed: f64,
    /// Depth-proportional DTM error (fraction of depth)
    pub dtm_pct: f64,
    /// Horizontal position tolerance (meters)
    pub horizontal_95: f64,
}

const IHO_TABLE: [IhoLimits; 4] = [
    IhoLimits { sounding_fixed: 0.2, sounding_pct: 0.0075, dtm_fixed: 0.2, dtm_pct: 0.0075, horizontal_95: 2.0 },
    IhoLimits { sounding_fixed: 0.5, sounding_pct: 0.013, dtm_fixed: 0.5, dtm_pct: 0.013, horizontal_95: 5.0 },
    IhoLimits { sounding_fixed: 1.0, sounding_pct: 0.023, dtm_fixed: 1.0, dtm_pct: 0.023, horizontal_95: 20.0 },
    IhoLimits { sounding_fixed: 1.0, sounding_pct: 0.023, dtm_fixed: 1.0, dtm_pct: 0.023, horizontal_95: 150.0 },
];

/// Tolerances for `order`
pub fn iho_limits(order: IhoOrder) -> IhoLimits {
    IHO_TABLE[order as usize - 1]
}

impl IhoLimits {
    /// 95% vertical bound at `depth`
    pub fn vertical_95(&self, depth: f64) -> f64 {
        let proportional = self.sounding_pct * depth;
        (self.sounding_fixed * self.sounding_fixed + proportional * proportional).sqrt()
    }
}

/// IHO strategy state: the order's tolerances reduced to one-sigma variances
#[derive(Debug, Clone, PartialEq)]
pub struct IhoModel {
    order: IhoOrder,
    fixed_var: f64,
    pct_var: f64,
    horizontal_var: f64,
}

impl IhoModel {
    pub fn new(order: IhoOrder) -> Self {
        let limits = iho_limits(order);
        let fixed = limits.sounding_fixed / CI95_SCALE;
        let pct = limits.sounding_pct / CI95_SCALE;
        let horizontal = limits.horizontal_95 / CI95_SCALE;
        Self {
            order,
            fixed_var: fixed * fixed,
            pct_var: pct * pct,
            horizontal_var: horizontal * horizontal,
        }
    }

    pub fn order(&self) -> IhoOrder {
        self.order
    }

    /// Attribute every sounding from its depth alone
    pub fn compute(&self, soundings: &mut [Sounding]) -> Result<()> {
        for sounding in soundings.iter_mut() {
            let depth = sounding.depth.abs();
            let vertical = self.fixed_var + self.pct_var * depth * depth;
            if !vertical.is_finite() {
                return Err(ErrModError::NonFiniteVertical { beam: sounding.beam });
            }
            sounding.vertical_variance = vertical;
            sounding.horizontal_variance = self.horizontal_var;
        }
        Ok(())
    }
}
