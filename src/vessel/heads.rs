//! Default, port and starboard vessel descriptions
//!
//! Single-head installations share one configuration between all three
//! logical heads. Dual and split head installations carry independent port
//! and starboard copies that may differ in any field.

use std::sync::Arc;

use super::VesselConfig;

/// Logical transducer head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Head {
    Default,
    Port,
    Starboard,
}

#[derive(Debug, Clone)]
pub struct HeadSet {
    default: Arc<VesselConfig>,
    port: Arc<VesselConfig>,
    starboard: Arc<VesselConfig>,
}

impl HeadSet {
    /// One configuration serving every head
    pub fn single(vessel: VesselConfig) -> Self {
        let shared = Arc::new(vessel);
        Self {
            default: Arc::clone(&shared),
            port: Arc::clone(&shared),
            starboard: shared,
        }
    }

    /// Independent port and starboard configurations
    pub fn split(default: VesselConfig, port: VesselConfig, starboard: VesselConfig) -> Self {
        Self {
            default: Arc::new(default),
            port: Arc::new(port),
            starboard: Arc::new(starboard),
        }
    }

    pub fn head(&self, head: Head) -> &Arc<VesselConfig> {
        match head {
            Head::Default => &self.default,
            Head::Port => &self.port,
            Head::Starboard => &self.starboard,
        }
    }

    /// True when port and starboard are the same configuration
    pub fn is_shared(&self) -> bool {
        Arc::ptr_eq(&self.port, &self.starboard)
    }

    /// Mutable access to one head. A head still shared with others is
    /// copied first, so edits never leak into the other heads.
    pub fn head_mut(&mut self, head: Head) -> &mut VesselConfig {
        let slot = match head {
            Head::Default => &mut self.default,
            Head::Port => &mut self.port,
            Head::Starboard => &mut self.starboard,
        };
        Arc::make_mut(slot)
    }
}
