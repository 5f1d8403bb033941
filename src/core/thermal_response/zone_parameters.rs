use crate::errors::InvalidParameter;
use serde::Deserialize;

/// Lumped thermal description of one zone, following the two-element
/// reduced-order network of VDI 6007 part 1: an inner-mass branch, an
/// outer-wall branch with a separate steady-state resistance, the surface
/// heat-transfer coefficients coupling them to the zone air, per-facade
/// envelope areas and the glazing/air-volume parameters.
///
/// Branch resistances are whole-zone aggregates in K/W (e.g. room type S
/// carries `r1_iw = 5.96e-4 K/W` for its 75.5 m² of inner surface),
/// capacitances are in J/K, areas in m² and surface coefficients in
/// W/(m²·K). Everything downstream works in Kelvin.
///
/// The struct is read-only to the engine: a model captures and validates it
/// at construction and derives its conductances once, so mutating parameters
/// mid-run is impossible by construction.
#[derive(Clone, Debug, Deserialize)]
pub struct ZoneThermalParameters {
    /// Inner-mass branch resistance, K/W.
    pub r1_iw: f64,
    /// Inner-mass branch capacitance, J/K.
    pub c1_iw: f64,
    /// Surface area coupled to the inner-mass branch, m².
    pub area_iw: f64,
    /// Near-surface resistance of the outer-wall branch, K/W.
    pub r1_ow: f64,
    /// Outer-wall branch capacitance, J/K.
    pub c1_ow: f64,
    /// Surface area coupled to the outer-wall branch, m².
    pub area_ow: f64,
    /// Remaining envelope conduction path, in series with the outer branch, K/W.
    pub r_rest_ow: f64,
    /// Outer-wall areas per facade segment, m².
    pub outer_wall_areas: Vec<f64>,
    /// Window areas per facade segment, m².
    pub window_areas: Vec<f64>,
    /// Transparent (solar-admitting) areas per facade segment, m².
    pub transparent_areas: Vec<f64>,
    /// Combined inner surface coefficient of the inner-mass branch, W/(m²·K).
    pub alpha_comb_inner_iw: f64,
    /// Combined inner surface coefficient of the outer-wall branch, W/(m²·K).
    pub alpha_comb_inner_ow: f64,
    /// Convective outer surface coefficient of the outer wall, W/(m²·K).
    pub alpha_conv_outer_ow: f64,
    /// Radiative outer surface coefficient of the outer wall, W/(m²·K).
    pub alpha_rad_outer_ow: f64,
    /// Combined outer surface coefficient of the outer wall, W/(m²·K).
    pub alpha_comb_outer_ow: f64,
    /// Mean radiative coefficient for inter-surface exchange, W/(m²·K).
    pub alpha_rad_inner_mean: f64,
    /// Convective share of radiation entering through glazing, in [0, 1].
    pub ratio_conv_rad_inner_win: f64,
    /// Weighted solar transmittance of the glazing, in [0, 1].
    pub weighted_g_value: f64,
    /// Zone air volume, m³.
    pub volume: f64,
    /// Air density, kg/m³.
    pub density_air: f64,
    /// Specific heat capacity of the zone air, J/(kg·K). Zero collapses the
    /// air node to an instantaneous algebraic balance.
    pub heat_capac_air: f64,
}

impl ZoneThermalParameters {
    pub(crate) fn validate(&self) -> Result<(), InvalidParameter> {
        for (name, value) in [
            ("r1_iw", self.r1_iw),
            ("c1_iw", self.c1_iw),
            ("r1_ow", self.r1_ow),
            ("c1_ow", self.c1_ow),
            ("r_rest_ow", self.r_rest_ow),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(InvalidParameter::NonPositive { name, value });
            }
        }
        for (name, value) in [
            ("area_iw", self.area_iw),
            ("area_ow", self.area_ow),
            ("alpha_comb_inner_iw", self.alpha_comb_inner_iw),
            ("alpha_comb_inner_ow", self.alpha_comb_inner_ow),
            ("alpha_conv_outer_ow", self.alpha_conv_outer_ow),
            ("alpha_rad_outer_ow", self.alpha_rad_outer_ow),
            ("alpha_comb_outer_ow", self.alpha_comb_outer_ow),
            ("alpha_rad_inner_mean", self.alpha_rad_inner_mean),
            ("volume", self.volume),
            ("density_air", self.density_air),
            ("heat_capac_air", self.heat_capac_air),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidParameter::Negative { name, value });
            }
        }
        for (name, value) in [
            ("ratio_conv_rad_inner_win", self.ratio_conv_rad_inner_win),
            ("weighted_g_value", self.weighted_g_value),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(InvalidParameter::OutsideUnitInterval { name, value });
            }
        }
        if self.window_areas.len() != self.outer_wall_areas.len()
            || self.transparent_areas.len() != self.outer_wall_areas.len()
        {
            return Err(InvalidParameter::MismatchedFacadeAreas {
                outer_walls: self.outer_wall_areas.len(),
                windows: self.window_areas.len(),
                transparent: self.transparent_areas.len(),
            });
        }
        for (name, areas) in [
            ("outer_wall_areas", &self.outer_wall_areas),
            ("window_areas", &self.window_areas),
            ("transparent_areas", &self.transparent_areas),
        ] {
            if let Some(value) = areas.iter().copied().find(|a| !a.is_finite() || *a < 0.0) {
                return Err(InvalidParameter::Negative { name, value });
            }
        }
        // The combined outer coefficient is definitionally the sum of its
        // convective and radiative parts.
        let sum = self.alpha_conv_outer_ow + self.alpha_rad_outer_ow;
        if !is_close!(self.alpha_comb_outer_ow, sum, rel_tol = 1e-6) {
            return Err(InvalidParameter::InconsistentOuterCoefficients {
                combined: self.alpha_comb_outer_ow,
                sum,
            });
        }
        Ok(())
    }

    /// Number of facade segments; per-facade boundary rows must match it.
    pub fn facade_count(&self) -> usize {
        self.outer_wall_areas.len()
    }
}
