//! Per-head routing for dual and split head installations
//!
//! Each head of a dual or split head system has its own mount, so its beams
//! are attributed against that head's vessel description. Single-head
//! devices, and multi-head devices whose heads share one description, run
//! through a single [`ErrorModel`].

use tracing::debug;

use super::{ErrorMethod, ErrorModel, ModelParams};
use crate::core::{Platform, Sounding};
use crate::device::DeviceSpec;
use crate::error::Result;
use crate::vessel::{Head, HeadSet};

#[derive(Debug, Clone)]
enum Heads {
    Single(ErrorModel),
    Split { port: ErrorModel, starboard: ErrorModel },
}

/// Error model spanning every head of one installation
#[derive(Debug, Clone)]
pub struct SwathErrorModel {
    device: &'static DeviceSpec,
    heads: Heads,
    /// Beams formed by the last ping; the starboard head starts at half
    beams_formed: u32,
}

impl SwathErrorModel {
    pub fn new(device: &'static DeviceSpec, vessels: &HeadSet, method: ErrorMethod, params: ModelParams) -> Result<Self> {
        let heads = match device.head_boundary() {
            Some(boundary) if !vessels.is_shared() => {
                debug!(device = device.name, boundary, "routing beams to separate heads");
                Heads::Split {
                    port: ErrorModel::with_params(device, vessels.head(Head::Port).clone(), method, params.clone())?,
                    starboard: ErrorModel::with_params(device, vessels.head(Head::Starboard).clone(), method, params)?,
                }
            }
            _ => Heads::Single(ErrorModel::with_params(
                device,
                vessels.head(Head::Default).clone(),
                method,
                params,
            )?),
        };
        Ok(Self {
            device,
            heads,
            beams_formed: device.max_beams,
        })
    }

    pub fn device(&self) -> &'static DeviceSpec {
        self.device
    }

    pub fn method(&self) -> ErrorMethod {
        match &self.heads {
            Heads::Single(model) => model.method(),
            Heads::Split { port, .. } => port.method(),
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self.heads, Heads::Split { .. })
    }

    /// Switch every head to `method`, or none of them.
    pub fn set_method(&mut self, method: ErrorMethod) -> Result<()> {
        match &mut self.heads {
            Heads::Single(model) => model.set_method(method),
            Heads::Split { port, starboard, .. } => {
                let port_strategy = port.prepare(method)?;
                let starboard_strategy = starboard.prepare(method)?;
                port.install(port_strategy);
                starboard.install(starboard_strategy);
                Ok(())
            }
        }
    }

    /// First starboard beam of the last ping, for split installations
    pub fn head_boundary(&self) -> Option<u32> {
        match self.heads {
            Heads::Single(_) => None,
            Heads::Split { .. } => Some(self.beams_formed / 2),
        }
    }

    /// Attribute a ping spanning both heads. Every beam is checked against
    /// the beams the ping formed before either head runs. Consecutive beams
    /// of the same head are handed to that head's model as one run.
    pub fn estimate(&mut self, platform: &Platform, soundings: &mut [Sounding]) -> Result<()> {
        let beams_formed = self.device.beams_formed(platform.beam_count);
        for sounding in soundings.iter() {
            self.device.check_beam_formed(sounding.beam, beams_formed)?;
        }
        self.beams_formed = beams_formed;

        match &mut self.heads {
            Heads::Single(model) => model.estimate(platform, soundings),
            Heads::Split { port, starboard } => {
                let boundary = beams_formed / 2;
                for run in soundings.chunk_by_mut(|a, b| (a.beam < boundary) == (b.beam < boundary)) {
                    if run[0].beam < boundary {
                        port.estimate(platform, run)?;
                    } else {
                        starboard.estimate(platform, run)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Beam angle in degrees as seen by the head that forms `beam`
    pub fn beam_angle(&self, beam: u32) -> Option<f64> {
        match &self.heads {
            Heads::Single(model) => model.beam_angle(beam),
            Heads::Split { port, starboard } => {
                if beam < self.beams_formed / 2 {
                    port.beam_angle(beam)
                } else {
                    starboard.beam_angle(beam)
                }
            }
        }
    }
}
