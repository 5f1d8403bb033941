mod compare_floats;
pub mod core;
pub mod errors;
pub mod simulation_time;

#[macro_use]
extern crate is_close;

pub use crate::core::controls::hvac_dispatch::{
    ControlSchedule, DispatchOrder, HVAC_DEVICES_PER_MODE,
};
pub use crate::core::thermal_response::boundary::BoundaryTimeSeries;
pub use crate::core::thermal_response::rc_network::{
    EbcModel, ReducedOrderModel, StateSpace, StepInputs, ThermalNode, VdiModel, ZoneState,
};
pub use crate::core::thermal_response::solver::{OutputSeries, ReducedOrderSolver, SimulationRun};
pub use crate::core::thermal_response::zone_parameters::ZoneThermalParameters;
pub use crate::errors::SimulationError;
pub use crate::simulation_time::SimulationTime;
use serde::Deserialize;

/// Selection between the available reduced-order calculation strategies.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMethod {
    #[default]
    Vdi,
    Ebc,
}

/// Run a single zone simulation end to end: validate the parameters, build
/// the requested model and integrate the full horizon.
pub fn simulate_zone(
    parameters: &ZoneThermalParameters,
    method: CalculationMethod,
    simulation_time: SimulationTime,
    boundary: &BoundaryTimeSeries,
    control: &ControlSchedule,
    initial_state: Option<ZoneState>,
) -> Result<OutputSeries, SimulationError> {
    match method {
        CalculationMethod::Vdi => ReducedOrderSolver::new(VdiModel::new(parameters)?, simulation_time)
            .simulate(boundary, control, initial_state),
        CalculationMethod::Ebc => ReducedOrderSolver::new(EbcModel::new(parameters)?, simulation_time)
            .simulate(boundary, control, initial_state),
    }
}
