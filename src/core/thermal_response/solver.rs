use crate::core::controls::hvac_dispatch::{dispatch_devices, ControlSchedule, DispatchMode};
use crate::core::thermal_response::boundary::BoundaryTimeSeries;
use crate::core::thermal_response::rc_network::{
    AdvanceFailure, ReducedOrderModel, StepInputs, ZoneState,
};
use crate::core::units::SECONDS_PER_HOUR;
use crate::errors::{NonPhysicalState, SimulationError};
use crate::simulation_time::SimulationTime;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, warn};

/// Initial node temperature used when neither the caller nor the boundary
/// series can provide one (empty horizon), matching the VDI 6007
/// verification-case convention of 22 °C.
const DEFAULT_INITIAL_TEMP: f64 = 295.15;

/// The two output series of a run, one entry per timestep: post-dispatch
/// zone air temperature in K, and net delivered heating (positive) or
/// cooling (negative) power in W.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputSeries {
    pub temp_air: Vec<f64>,
    pub heat_cool_power: Vec<f64>,
}

/// Inputs for one entry of a batch: boundary conditions, control schedule
/// and optional initial node temperatures for an independent run.
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationRun {
    pub boundary: BoundaryTimeSeries,
    pub control: ControlSchedule,
    #[serde(default)]
    pub initial_state: Option<ZoneState>,
}

/// Fixed-timestep simulation loop coupling the free-running thermal
/// response of a zone model to ideal prioritized heating/cooling dispatch.
pub struct ReducedOrderSolver<M: ReducedOrderModel> {
    model: M,
    simulation_time: SimulationTime,
}

impl<M: ReducedOrderModel> ReducedOrderSolver<M> {
    pub fn new(model: M, simulation_time: SimulationTime) -> Self {
        Self {
            model,
            simulation_time,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run the full horizon and return the two output series.
    ///
    /// Per step: advance the model with zero controlled power, compare the
    /// free-running air temperature against the setpoints, dispatch the
    /// devices in priority order against the required correction, then
    /// re-advance from the same state with the delivered power injected at
    /// the air node. Boundary and control arrays are validated against the
    /// horizon before the loop starts, so a run either starts clean or is
    /// rejected entirely.
    pub fn simulate(
        &self,
        boundary: &BoundaryTimeSeries,
        control: &ControlSchedule,
        initial_state: Option<ZoneState>,
    ) -> Result<OutputSeries, SimulationError> {
        let timesteps = self.simulation_time.total_steps();
        boundary.validate(timesteps, self.model.facade_count())?;
        control.validate(timesteps)?;
        let delta_t = self.simulation_time.step() * SECONDS_PER_HOUR as f64;
        debug!(timesteps, delta_t, "starting reduced-order simulation");

        let mut state = initial_state.unwrap_or_else(|| {
            ZoneState::uniform(
                boundary
                    .equal_air_temp
                    .first()
                    .copied()
                    .unwrap_or(DEFAULT_INITIAL_TEMP),
            )
        });
        let mut temp_air = Vec::with_capacity(timesteps);
        let mut heat_cool_power = Vec::with_capacity(timesteps);
        let mut saturated_steps = 0usize;

        for t_it in self.simulation_time.iter() {
            let step = t_it.index;
            let inputs = StepInputs {
                equal_air_temp: boundary.equal_air_temp[step],
                outdoor_air_temp: boundary.outdoor_air_temp[step],
                vent_rate: boundary.vent_rate[step],
                solar_gains: self
                    .model
                    .transmitted_solar_gains(&boundary.solar_rad_in[step]),
                internal_gains_rad: boundary.internal_gains_rad[step],
                internal_gains_conv: boundary.internal_gains[step]
                    + boundary.internal_heat_sources[step],
            };

            // Free-running response with zero controlled power.
            let free = self
                .model
                .advance(&state, &inputs, 0.0, delta_t)
                .map_err(|failure| map_failure(failure, step))?;

            // Power needed to move the air node to the violated setpoint
            // within this step, from the air node's effective admittance.
            let requested = if free.temp_air < control.t_set_heating[step] {
                let response = self
                    .model
                    .unit_power_response(&inputs, delta_t)
                    .map_err(|failure| map_failure(failure, step))?;
                (control.t_set_heating[step] - free.temp_air) / response
            } else if free.temp_air > control.t_set_cooling[step] {
                let response = self
                    .model
                    .unit_power_response(&inputs, delta_t)
                    .map_err(|failure| map_failure(failure, step))?;
                (control.t_set_cooling[step] - free.temp_air) / response
            } else {
                0.0
            };

            let delivered = if requested > 0.0 {
                dispatch_devices(
                    requested,
                    &control.heater_limit[step],
                    &control.heater_order,
                    DispatchMode::Heating,
                )
            } else if requested < 0.0 {
                dispatch_devices(
                    requested,
                    &control.cooler_limit[step],
                    &control.cooler_order,
                    DispatchMode::Cooling,
                )
            } else {
                0.0
            };
            if !is_close!(delivered, requested, rel_tol = 1e-9) {
                saturated_steps += 1;
            }

            let next = if is_close!(delivered, 0.0) {
                free
            } else {
                self.model
                    .advance(&state, &inputs, delivered, delta_t)
                    .map_err(|failure| map_failure(failure, step))?
            };

            temp_air.push(next.temp_air);
            heat_cool_power.push(delivered);
            state = next;
        }

        if saturated_steps > 0 {
            warn!(
                saturated_steps,
                timesteps, "plant capacity saturated; setpoints not met at some steps"
            );
        }
        debug!("reduced-order simulation complete");
        Ok(OutputSeries {
            temp_air,
            heat_cool_power,
        })
    }

    /// Simulate independent runs in parallel. Each run owns its state and
    /// output arrays exclusively; the model and its derived matrices are
    /// shared immutably.
    pub fn simulate_batch(&self, runs: &[SimulationRun]) -> Vec<Result<OutputSeries, SimulationError>>
    where
        M: Sync,
    {
        runs.par_iter()
            .map(|run| self.simulate(&run.boundary, &run.control, run.initial_state))
            .collect()
    }
}

fn map_failure(failure: AdvanceFailure, step: usize) -> NonPhysicalState {
    match failure {
        AdvanceFailure::NonFinite(node) => NonPhysicalState::NonFiniteTemperature { step, node },
        AdvanceFailure::Singular => NonPhysicalState::SingularBalance { step },
    }
}
