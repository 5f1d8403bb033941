use crate::core::thermal_response::zone_parameters::ZoneThermalParameters;
use crate::core::units::SECONDS_PER_HOUR;
use crate::errors::InvalidParameter;
use nalgebra::{Matrix3, RowVector3, SMatrix, Vector3};
use serde::Deserialize;
use std::fmt;

/// This module holds the RC-network kernel shared by the calculation
/// strategies: the conductances derived once from the zone parameters, the
/// implicit Euler state update and the discrete state-space matrices the
/// network induces.

/// The three lumped nodes of the network.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ThermalNode {
    InnerWall,
    OuterWall,
    Air,
}

impl fmt::Display for ThermalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThermalNode::InnerWall => "inner-mass",
            ThermalNode::OuterWall => "outer-wall",
            ThermalNode::Air => "air",
        })
    }
}

/// Node temperatures carried across timesteps, in Kelvin.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct ZoneState {
    pub temp_inner_wall: f64,
    pub temp_outer_wall: f64,
    pub temp_air: f64,
}

impl ZoneState {
    pub fn uniform(temp: f64) -> Self {
        Self {
            temp_inner_wall: temp,
            temp_outer_wall: temp,
            temp_air: temp,
        }
    }

    fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.temp_inner_wall, self.temp_outer_wall, self.temp_air)
    }

    fn from_vector(x: &Vector3<f64>) -> Self {
        Self {
            temp_inner_wall: x[0],
            temp_outer_wall: x[1],
            temp_air: x[2],
        }
    }

    pub(crate) fn non_finite_node(&self) -> Option<ThermalNode> {
        if !self.temp_inner_wall.is_finite() {
            Some(ThermalNode::InnerWall)
        } else if !self.temp_outer_wall.is_finite() {
            Some(ThermalNode::OuterWall)
        } else if !self.temp_air.is_finite() {
            Some(ThermalNode::Air)
        } else {
            None
        }
    }
}

/// Boundary and gain values for a single timestep, reduced to scalars by the
/// solver (per-facade solar already collapsed to transmitted watts).
#[derive(Clone, Copy, Debug, Default)]
pub struct StepInputs {
    /// Equivalent outdoor temperature driving the outer branch, K.
    pub equal_air_temp: f64,
    /// Outdoor air temperature supplying ventilation, K.
    pub outdoor_air_temp: f64,
    /// Air exchange rate, 1/h.
    pub vent_rate: f64,
    /// Solar gains transmitted through the transparent areas, W.
    pub solar_gains: f64,
    /// Radiative internal gains, W.
    pub internal_gains_rad: f64,
    /// Convective internal gains and source terms, W.
    pub internal_gains_conv: f64,
}

/// Why a single state update failed. The solver attaches the step index when
/// it surfaces this as a `NonPhysicalState`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdvanceFailure {
    NonFinite(ThermalNode),
    Singular,
}

/// Discrete-time state-space matrices induced by the network for one step's
/// ventilation coefficient and timestep length:
///
/// `x[k+1] = transition · x[k] + input · u[k]`, `y[k] = output · x[k+1]`
///
/// with state `x = [t_inner_wall, t_outer_wall, t_air]ᵀ` and input
/// `u = [t_equal_air, t_outdoor_air, gains_rad, gains_conv, q_hc]ᵀ`.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSpace {
    pub transition: Matrix3<f64>,
    pub input: SMatrix<f64, 3, 5>,
    pub output: RowVector3<f64>,
}

/// One reduced-order calculation strategy over the shared RC kernel.
pub trait ReducedOrderModel {
    /// Advance the state by one implicit Euler step of `delta_t` seconds,
    /// with net controlled power `heat_cool_power` (heating positive)
    /// injected at the air node.
    fn advance(
        &self,
        state: &ZoneState,
        inputs: &StepInputs,
        heat_cool_power: f64,
        delta_t: f64,
    ) -> Result<ZoneState, AdvanceFailure>;

    /// Air-temperature response to unit power injected at the air node over
    /// one step, in K/W: the effective inverse admittance of the air node
    /// under this step's ventilation coefficient.
    fn unit_power_response(&self, inputs: &StepInputs, delta_t: f64)
        -> Result<f64, AdvanceFailure>;

    /// The discrete state-space matrices for this step's conditions.
    fn state_space(&self, vent_rate: f64, delta_t: f64) -> Result<StateSpace, AdvanceFailure>;

    /// Solar gains transmitted through the transparent areas for one step's
    /// per-facade irradiance, W.
    fn transmitted_solar_gains(&self, irradiance: &[f64]) -> f64;

    /// Number of facade segments the per-facade boundary rows must match.
    fn facade_count(&self) -> usize;
}

/// Conductances and capacities derived once from validated parameters.
/// Immutable for the duration of a run.
#[derive(Clone, Debug)]
pub(crate) struct RcNetwork {
    /// Inner-mass node to air: branch conduction in series with the inner
    /// surface film, W/K.
    h_iw_air: f64,
    /// Outer-wall node to air through the inner surface film, W/K.
    h_ow_air: f64,
    /// Ambient to outer-wall node: outer film in series with the full branch
    /// resistance, W/K.
    h_ow_amb: f64,
    /// Long-wave exchange between the two wall surfaces, W/K.
    h_rad: f64,
    c_iw: f64,
    c_ow: f64,
    c_air: f64,
    /// Ventilation coefficient per unit air-change rate, W/K per 1/h.
    vent_coeff_per_ach: f64,
    /// Radiative gain shares of the wall nodes. They sum to less than one
    /// when the glazing loss share is modelled.
    dist_rad_iw: f64,
    dist_rad_ow: f64,
    conv_frac_win: f64,
    g_value: f64,
    transparent_areas: Vec<f64>,
}

impl RcNetwork {
    fn with_distribution(
        parameters: &ZoneThermalParameters,
        dist_rad_iw: f64,
        dist_rad_ow: f64,
    ) -> Self {
        let film_iw = parameters.alpha_comb_inner_iw * parameters.area_iw;
        let h_iw_air = if film_iw > 0.0 {
            1.0 / (parameters.r1_iw + 1.0 / film_iw)
        } else {
            0.0
        };
        let h_ow_air = parameters.alpha_comb_inner_ow * parameters.area_ow;
        let outer_film =
            parameters.alpha_comb_outer_ow * parameters.outer_wall_areas.iter().sum::<f64>();
        let mut resistance_amb = parameters.r_rest_ow + parameters.r1_ow;
        if outer_film > 0.0 {
            resistance_amb += 1.0 / outer_film;
        }
        let h_ow_amb = 1.0 / resistance_amb;
        // Two-surface exchange: the mean radiative coefficient acting on the
        // series combination of the two surface areas.
        let area_sum = parameters.area_iw + parameters.area_ow;
        let h_rad = if area_sum > 0.0 {
            parameters.alpha_rad_inner_mean * parameters.area_iw * parameters.area_ow / area_sum
        } else {
            0.0
        };
        let heat_capacity_volumetric = parameters.density_air * parameters.heat_capac_air;
        Self {
            h_iw_air,
            h_ow_air,
            h_ow_amb,
            h_rad,
            c_iw: parameters.c1_iw,
            c_ow: parameters.c1_ow,
            c_air: parameters.volume * heat_capacity_volumetric,
            vent_coeff_per_ach: parameters.volume * heat_capacity_volumetric
                / SECONDS_PER_HOUR as f64,
            dist_rad_iw,
            dist_rad_ow,
            conv_frac_win: parameters.ratio_conv_rad_inner_win,
            g_value: parameters.weighted_g_value,
            transparent_areas: parameters.transparent_areas.clone(),
        }
    }

    fn balance_matrix(&self, vent_coeff: f64, delta_t: f64) -> Matrix3<f64> {
        let k_iw = self.c_iw / delta_t;
        let k_ow = self.c_ow / delta_t;
        let k_air = self.c_air / delta_t;
        Matrix3::new(
            k_iw + self.h_iw_air + self.h_rad,
            -self.h_rad,
            -self.h_iw_air,
            -self.h_rad,
            k_ow + self.h_ow_amb + self.h_ow_air + self.h_rad,
            -self.h_ow_air,
            -self.h_iw_air,
            -self.h_ow_air,
            k_air + self.h_iw_air + self.h_ow_air + vent_coeff,
        )
    }

    /// Gains at the wall nodes (radiative) and the air node (convective)
    /// after applying the glazing split to the transmitted solar gains.
    fn gain_totals(&self, inputs: &StepInputs) -> (f64, f64) {
        let gains_rad = inputs.internal_gains_rad + (1.0 - self.conv_frac_win) * inputs.solar_gains;
        let gains_conv = inputs.internal_gains_conv + self.conv_frac_win * inputs.solar_gains;
        (gains_rad, gains_conv)
    }

    pub(crate) fn advance(
        &self,
        state: &ZoneState,
        inputs: &StepInputs,
        heat_cool_power: f64,
        delta_t: f64,
    ) -> Result<ZoneState, AdvanceFailure> {
        let vent_coeff = self.vent_coeff_per_ach * inputs.vent_rate;
        let (gains_rad, gains_conv) = self.gain_totals(inputs);
        let m = self.balance_matrix(vent_coeff, delta_t);
        let capacity = Vector3::new(
            self.c_iw / delta_t,
            self.c_ow / delta_t,
            self.c_air / delta_t,
        );
        let sources = Vector3::new(
            self.dist_rad_iw * gains_rad,
            self.h_ow_amb * inputs.equal_air_temp + self.dist_rad_ow * gains_rad,
            vent_coeff * inputs.outdoor_air_temp + gains_conv + heat_cool_power,
        );
        let b = capacity.component_mul(&state.to_vector()) + sources;
        let x = m.lu().solve(&b).ok_or(AdvanceFailure::Singular)?;
        let next = ZoneState::from_vector(&x);
        match next.non_finite_node() {
            Some(node) => Err(AdvanceFailure::NonFinite(node)),
            None => Ok(next),
        }
    }

    pub(crate) fn unit_power_response(
        &self,
        inputs: &StepInputs,
        delta_t: f64,
    ) -> Result<f64, AdvanceFailure> {
        let vent_coeff = self.vent_coeff_per_ach * inputs.vent_rate;
        let m = self.balance_matrix(vent_coeff, delta_t);
        let response = m
            .lu()
            .solve(&Vector3::new(0.0, 0.0, 1.0))
            .ok_or(AdvanceFailure::Singular)?[2];
        if response.is_finite() && response > 0.0 {
            Ok(response)
        } else {
            Err(AdvanceFailure::Singular)
        }
    }

    pub(crate) fn state_space(
        &self,
        vent_rate: f64,
        delta_t: f64,
    ) -> Result<StateSpace, AdvanceFailure> {
        let vent_coeff = self.vent_coeff_per_ach * vent_rate;
        let inverse = self
            .balance_matrix(vent_coeff, delta_t)
            .try_inverse()
            .ok_or(AdvanceFailure::Singular)?;
        let capacity = Matrix3::from_diagonal(&Vector3::new(
            self.c_iw / delta_t,
            self.c_ow / delta_t,
            self.c_air / delta_t,
        ));
        let mut sources = SMatrix::<f64, 3, 5>::zeros();
        sources[(0, 2)] = self.dist_rad_iw;
        sources[(1, 0)] = self.h_ow_amb;
        sources[(1, 2)] = self.dist_rad_ow;
        sources[(2, 1)] = vent_coeff;
        sources[(2, 3)] = 1.0;
        sources[(2, 4)] = 1.0;
        Ok(StateSpace {
            transition: inverse * capacity,
            input: inverse * sources,
            output: RowVector3::new(0.0, 0.0, 1.0),
        })
    }

    pub(crate) fn transmitted_solar_gains(&self, irradiance: &[f64]) -> f64 {
        self.g_value
            * irradiance
                .iter()
                .zip(&self.transparent_areas)
                .map(|(rad, area)| rad * area)
                .sum::<f64>()
    }

    pub(crate) fn facade_count(&self) -> usize {
        self.transparent_areas.len()
    }
}

/// VDI 6007 strategy: radiative gains are distributed over the inner
/// surfaces by area, with the glazing share lost back through the windows.
#[derive(Clone, Debug)]
pub struct VdiModel {
    network: RcNetwork,
}

impl VdiModel {
    pub fn new(parameters: &ZoneThermalParameters) -> Result<Self, InvalidParameter> {
        parameters.validate()?;
        let area_win: f64 = parameters.window_areas.iter().sum();
        let denominator = parameters.area_iw + parameters.area_ow + area_win;
        let (dist_rad_iw, dist_rad_ow) = if denominator > 0.0 {
            (
                parameters.area_iw / denominator,
                parameters.area_ow / denominator,
            )
        } else {
            (0.0, 0.0)
        };
        Ok(Self {
            network: RcNetwork::with_distribution(parameters, dist_rad_iw, dist_rad_ow),
        })
    }
}

/// EBC variant: plain area weighting over the two wall surfaces, without the
/// glazing loss term.
#[derive(Clone, Debug)]
pub struct EbcModel {
    network: RcNetwork,
}

impl EbcModel {
    pub fn new(parameters: &ZoneThermalParameters) -> Result<Self, InvalidParameter> {
        parameters.validate()?;
        let denominator = parameters.area_iw + parameters.area_ow;
        let (dist_rad_iw, dist_rad_ow) = if denominator > 0.0 {
            (
                parameters.area_iw / denominator,
                parameters.area_ow / denominator,
            )
        } else {
            (0.0, 0.0)
        };
        Ok(Self {
            network: RcNetwork::with_distribution(parameters, dist_rad_iw, dist_rad_ow),
        })
    }
}

macro_rules! delegate_to_network {
    ($model:ty) => {
        impl ReducedOrderModel for $model {
            fn advance(
                &self,
                state: &ZoneState,
                inputs: &StepInputs,
                heat_cool_power: f64,
                delta_t: f64,
            ) -> Result<ZoneState, AdvanceFailure> {
                self.network.advance(state, inputs, heat_cool_power, delta_t)
            }

            fn unit_power_response(
                &self,
                inputs: &StepInputs,
                delta_t: f64,
            ) -> Result<f64, AdvanceFailure> {
                self.network.unit_power_response(inputs, delta_t)
            }

            fn state_space(
                &self,
                vent_rate: f64,
                delta_t: f64,
            ) -> Result<StateSpace, AdvanceFailure> {
                self.network.state_space(vent_rate, delta_t)
            }

            fn transmitted_solar_gains(&self, irradiance: &[f64]) -> f64 {
                self.network.transmitted_solar_gains(irradiance)
            }

            fn facade_count(&self) -> usize {
                self.network.facade_count()
            }
        }
    };
}

delegate_to_network!(VdiModel);
delegate_to_network!(EbcModel);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::SVector;
    use rstest::*;

    /// The input vector matching `StateSpace::input` for one step.
    fn input_vector(
        network: &RcNetwork,
        inputs: &StepInputs,
        heat_cool_power: f64,
    ) -> SVector<f64, 5> {
        let (gains_rad, gains_conv) = network.gain_totals(inputs);
        SVector::<f64, 5>::from([
            inputs.equal_air_temp,
            inputs.outdoor_air_temp,
            gains_rad,
            gains_conv,
            heat_cool_power,
        ])
    }

    fn room_type_s(heat_capac_air: f64) -> ZoneThermalParameters {
        ZoneThermalParameters {
            r1_iw: 0.000595693407511,
            c1_iw: 14836354.6282,
            area_iw: 75.5,
            r1_ow: 0.00436791293674,
            c1_ow: 1600848.94,
            area_ow: 10.5,
            r_rest_ow: 0.03895919557,
            outer_wall_areas: vec![10.5],
            window_areas: vec![0.0],
            transparent_areas: vec![0.0],
            alpha_comb_inner_iw: 2.24,
            alpha_comb_inner_ow: 2.7,
            alpha_conv_outer_ow: 20.0,
            alpha_rad_outer_ow: 5.0,
            alpha_comb_outer_ow: 25.0,
            alpha_rad_inner_mean: 5.0,
            ratio_conv_rad_inner_win: 0.09,
            weighted_g_value: 1.0,
            volume: 52.5,
            density_air: 1.19,
            heat_capac_air,
        }
    }

    #[fixture]
    fn model() -> VdiModel {
        VdiModel::new(&room_type_s(1007.0)).unwrap()
    }

    #[fixture]
    fn massless_air_model() -> VdiModel {
        VdiModel::new(&room_type_s(0.0)).unwrap()
    }

    fn constant_ambient(temp: f64) -> StepInputs {
        StepInputs {
            equal_air_temp: temp,
            outdoor_air_temp: temp,
            ..Default::default()
        }
    }

    #[rstest]
    fn should_relax_towards_constant_ambient(model: VdiModel) {
        let state = ZoneState::uniform(300.15);
        let next = model
            .advance(&state, &constant_ambient(295.15), 0.0, 3600.0)
            .unwrap();
        assert!(next.temp_air < 300.15 && next.temp_air > 295.15);
        assert!(next.temp_outer_wall < 300.15 && next.temp_outer_wall > 295.15);
        assert!(next.temp_inner_wall < 300.15 && next.temp_inner_wall > 295.15);
    }

    #[rstest]
    fn should_hold_equilibrium_at_ambient(model: VdiModel) {
        let state = ZoneState::uniform(295.15);
        let next = model
            .advance(&state, &constant_ambient(295.15), 0.0, 3600.0)
            .unwrap();
        assert_relative_eq!(next.temp_air, 295.15, max_relative = 1e-10);
        assert_relative_eq!(next.temp_inner_wall, 295.15, max_relative = 1e-10);
        assert_relative_eq!(next.temp_outer_wall, 295.15, max_relative = 1e-10);
    }

    #[rstest]
    fn should_satisfy_algebraic_air_balance_with_zero_air_capacity(massless_air_model: VdiModel) {
        let network = &massless_air_model.network;
        let inputs = StepInputs {
            equal_air_temp: 295.15,
            outdoor_air_temp: 295.15,
            internal_gains_rad: 1000.0,
            internal_gains_conv: 120.0,
            ..Default::default()
        };
        let mut state = ZoneState::uniform(295.15);
        for _ in 0..48 {
            state = massless_air_model
                .advance(&state, &inputs, -75.0, 3600.0)
                .unwrap();
            let balance = network.h_iw_air * (state.temp_inner_wall - state.temp_air)
                + network.h_ow_air * (state.temp_outer_wall - state.temp_air)
                + inputs.internal_gains_conv
                - 75.0;
            assert_relative_eq!(balance, 0.0, epsilon = 1e-6);
        }
    }

    #[rstest]
    fn should_match_unit_power_response_against_paired_advances(model: VdiModel) {
        let state = ZoneState::uniform(295.15);
        let inputs = constant_ambient(290.15);
        let free = model.advance(&state, &inputs, 0.0, 3600.0).unwrap();
        let powered = model.advance(&state, &inputs, 1.0, 3600.0).unwrap();
        let response = model.unit_power_response(&inputs, 3600.0).unwrap();
        assert!(response > 0.0);
        assert_relative_eq!(
            powered.temp_air - free.temp_air,
            response,
            max_relative = 1e-9
        );
    }

    #[rstest]
    fn should_agree_with_state_space_matrices(model: VdiModel) {
        let state = ZoneState {
            temp_inner_wall: 293.65,
            temp_outer_wall: 291.15,
            temp_air: 296.35,
        };
        let inputs = StepInputs {
            equal_air_temp: 278.15,
            outdoor_air_temp: 280.15,
            vent_rate: 0.7,
            solar_gains: 310.0,
            internal_gains_rad: 420.0,
            internal_gains_conv: 160.0,
        };
        let next = model.advance(&state, &inputs, 250.0, 900.0).unwrap();
        let space = model.state_space(inputs.vent_rate, 900.0).unwrap();
        let predicted = space.transition * state.to_vector()
            + space.input * input_vector(&model.network, &inputs, 250.0);
        assert_relative_eq!(next.temp_inner_wall, predicted[0], max_relative = 1e-9);
        assert_relative_eq!(next.temp_outer_wall, predicted[1], max_relative = 1e-9);
        assert_relative_eq!(next.temp_air, predicted[2], max_relative = 1e-9);
        assert_relative_eq!(
            (space.output * predicted)[0],
            next.temp_air,
            max_relative = 1e-9
        );
    }

    #[rstest]
    fn should_report_singular_balance_for_fully_decoupled_air_node() {
        let mut parameters = room_type_s(0.0);
        parameters.alpha_comb_inner_iw = 0.0;
        parameters.alpha_comb_inner_ow = 0.0;
        let model = VdiModel::new(&parameters).unwrap();
        let state = ZoneState::uniform(295.15);
        assert_eq!(
            model.advance(&state, &constant_ambient(295.15), 0.0, 3600.0),
            Err(AdvanceFailure::Singular)
        );
        assert_eq!(
            model.unit_power_response(&constant_ambient(295.15), 3600.0),
            Err(AdvanceFailure::Singular)
        );
    }

    #[rstest]
    fn should_propagate_non_finite_boundary_as_non_finite_node(model: VdiModel) {
        let state = ZoneState::uniform(295.15);
        let inputs = StepInputs {
            equal_air_temp: f64::NAN,
            outdoor_air_temp: 295.15,
            ..Default::default()
        };
        assert!(matches!(
            model.advance(&state, &inputs, 0.0, 3600.0),
            Err(AdvanceFailure::NonFinite(_))
        ));
    }

    #[rstest]
    fn should_sum_transmitted_solar_over_facades() {
        let mut parameters = room_type_s(1007.0);
        parameters.outer_wall_areas = vec![10.5, 8.0];
        parameters.window_areas = vec![2.0, 1.0];
        parameters.transparent_areas = vec![2.0, 1.0];
        parameters.weighted_g_value = 0.7;
        let model = VdiModel::new(&parameters).unwrap();
        assert_relative_eq!(
            model.transmitted_solar_gains(&[100.0, 50.0]),
            0.7 * (100.0 * 2.0 + 50.0 * 1.0)
        );
        assert_eq!(model.facade_count(), 2);
    }

    #[rstest]
    fn should_distribute_radiative_gains_differently_per_strategy() {
        let mut parameters = room_type_s(1007.0);
        parameters.window_areas = vec![14.0];
        parameters.transparent_areas = vec![12.0];
        let vdi = VdiModel::new(&parameters).unwrap();
        let ebc = EbcModel::new(&parameters).unwrap();
        // The glazing loss share shrinks the wall-node weights under the
        // VDI rule only.
        assert!(vdi.network.dist_rad_iw < ebc.network.dist_rad_iw);
        assert_relative_eq!(
            ebc.network.dist_rad_iw + ebc.network.dist_rad_ow,
            1.0,
            max_relative = 1e-12
        );
        let state = ZoneState::uniform(295.15);
        let inputs = StepInputs {
            equal_air_temp: 295.15,
            outdoor_air_temp: 295.15,
            internal_gains_rad: 800.0,
            ..Default::default()
        };
        let next_vdi = vdi.advance(&state, &inputs, 0.0, 3600.0).unwrap();
        let next_ebc = ebc.advance(&state, &inputs, 0.0, 3600.0).unwrap();
        assert!(next_ebc.temp_inner_wall > next_vdi.temp_inner_wall);
    }
}
