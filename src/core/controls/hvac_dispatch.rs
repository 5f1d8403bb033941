use crate::compare_floats::{max_of_2, min_of_2};
use crate::errors::InvalidSetpoints;
use itertools::izip;
use serde::Deserialize;

/// This module provides the ideal heating/cooling control surface of a run:
/// per-timestep setpoints, per-device capacity limits and the fixed dispatch
/// priority walked at every step.

/// Number of dispatchable devices per mode (heating or cooling).
pub const HVAC_DEVICES_PER_MODE: usize = 3;

/// Fixed dispatch priority: a permutation of the device indices, chosen once
/// per run and applied identically at every timestep.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "[usize; HVAC_DEVICES_PER_MODE]")]
pub struct DispatchOrder([usize; HVAC_DEVICES_PER_MODE]);

impl DispatchOrder {
    pub fn new(order: [usize; HVAC_DEVICES_PER_MODE]) -> Result<Self, InvalidSetpoints> {
        let mut seen = [false; HVAC_DEVICES_PER_MODE];
        for device in order {
            if device >= HVAC_DEVICES_PER_MODE || seen[device] {
                return Err(InvalidSetpoints::NotAPermutation { order });
            }
            seen[device] = true;
        }
        Ok(Self(order))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.into_iter()
    }
}

impl Default for DispatchOrder {
    fn default() -> Self {
        Self([0, 1, 2])
    }
}

impl TryFrom<[usize; HVAC_DEVICES_PER_MODE]> for DispatchOrder {
    type Error = InvalidSetpoints;

    fn try_from(order: [usize; HVAC_DEVICES_PER_MODE]) -> Result<Self, Self::Error> {
        Self::new(order)
    }
}

/// Setpoints and device capacity limits for one run, one entry per timestep.
///
/// Heating limits are non-negative and cooling limits non-positive by
/// convention; a limit of exactly zero takes the device offline for that
/// step. Setpoints are in Kelvin and must satisfy heating <= cooling at
/// every step.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ControlSchedule {
    pub t_set_heating: Vec<f64>,
    pub t_set_cooling: Vec<f64>,
    pub heater_limit: Vec<[f64; HVAC_DEVICES_PER_MODE]>,
    pub cooler_limit: Vec<[f64; HVAC_DEVICES_PER_MODE]>,
    #[serde(default)]
    pub heater_order: DispatchOrder,
    #[serde(default)]
    pub cooler_order: DispatchOrder,
}

impl ControlSchedule {
    pub(crate) fn validate(&self, timesteps: usize) -> Result<(), InvalidSetpoints> {
        InvalidSetpoints::check_length("t_set_heating", self.t_set_heating.len(), timesteps)?;
        InvalidSetpoints::check_length("t_set_cooling", self.t_set_cooling.len(), timesteps)?;
        InvalidSetpoints::check_length("heater_limit", self.heater_limit.len(), timesteps)?;
        InvalidSetpoints::check_length("cooler_limit", self.cooler_limit.len(), timesteps)?;
        for (step, (heating, cooling)) in
            izip!(&self.t_set_heating, &self.t_set_cooling).enumerate()
        {
            if heating > cooling {
                return Err(InvalidSetpoints::HeatingAboveCooling {
                    step,
                    heating: *heating,
                    cooling: *cooling,
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DispatchMode {
    Heating,
    Cooling,
}

/// Walk the devices in priority order, each contributing power up to its
/// signed capacity limit, until the requested power is met or the ordered
/// list is exhausted. Returns the total delivered power; any shortfall is
/// left unmet (under-sized plant is expected behaviour, not an error).
pub(crate) fn dispatch_devices(
    requested: f64,
    limits: &[f64; HVAC_DEVICES_PER_MODE],
    order: &DispatchOrder,
    mode: DispatchMode,
) -> f64 {
    let mut delivered = 0.0;
    for device in order.iter() {
        let remaining = requested - delivered;
        delivered += match mode {
            DispatchMode::Heating => min_of_2(remaining, max_of_2(limits[device], 0.0)),
            DispatchMode::Cooling => max_of_2(remaining, min_of_2(limits[device], 0.0)),
        };
    }
    delivered
}
