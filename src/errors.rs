use crate::core::controls::hvac_dispatch::HVAC_DEVICES_PER_MODE;
use crate::core::thermal_response::rc_network::ThermalNode;
use thiserror::Error;

/// Top-level error returned by a reduced-order simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid zone parameter: {0}")]
    InvalidParameter(#[from] InvalidParameter),
    #[error("Invalid control schedule: {0}")]
    InvalidSetpoints(#[from] InvalidSetpoints),
    #[error("Non-physical state: {0}")]
    NonPhysicalState(#[from] NonPhysicalState),
}

/// Malformed or non-physical zone parameters. Detected when a model is
/// constructed from the parameters; never surfaces mid-run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidParameter {
    #[error("{name} must be strictly positive (got {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must not be negative (got {value})")]
    Negative { name: &'static str, value: f64 },
    #[error("{name} must lie within [0, 1] (got {value})")]
    OutsideUnitInterval { name: &'static str, value: f64 },
    #[error("per-facade area arrays must have equal lengths (outer walls: {outer_walls}, windows: {windows}, transparent: {transparent})")]
    MismatchedFacadeAreas {
        outer_walls: usize,
        windows: usize,
        transparent: usize,
    },
    #[error("alpha_comb_outer_ow ({combined}) must equal alpha_conv_outer_ow + alpha_rad_outer_ow ({sum})")]
    InconsistentOuterCoefficients { combined: f64, sum: f64 },
}

/// Inconsistent setpoint or schedule input. Detected by the pre-flight
/// validation pass over the full arrays, so a run either starts clean or is
/// rejected entirely.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidSetpoints {
    #[error("heating setpoint {heating} K exceeds cooling setpoint {cooling} K at step {step}")]
    HeatingAboveCooling {
        step: usize,
        heating: f64,
        cooling: f64,
    },
    #[error("{name} has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("solar radiation row at step {step} has {actual} facade entries, expected {expected}")]
    FacadeCountMismatch {
        step: usize,
        expected: usize,
        actual: usize,
    },
    #[error("dispatch order {order:?} is not a permutation of the device indices")]
    NotAPermutation {
        order: [usize; HVAC_DEVICES_PER_MODE],
    },
}

impl InvalidSetpoints {
    pub(crate) fn check_length(
        name: &'static str,
        actual: usize,
        expected: usize,
    ) -> Result<(), InvalidSetpoints> {
        if actual == expected {
            Ok(())
        } else {
            Err(InvalidSetpoints::LengthMismatch {
                name,
                expected,
                actual,
            })
        }
    }
}

/// Integration failure at some step. Fatal: the run aborts immediately and
/// reports the offending step, as retrying a deterministic calculation with
/// the same inputs would reproduce the same failure.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum NonPhysicalState {
    #[error("non-finite {node} node temperature at step {step}; the timestep is too large for the network's time constants")]
    NonFiniteTemperature { step: usize, node: ThermalNode },
    #[error("singular thermal balance at step {step}: the air node has no finite coupling")]
    SingularBalance { step: usize },
}
