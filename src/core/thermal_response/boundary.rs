use crate::errors::InvalidSetpoints;
use serde::Deserialize;

/// Per-timestep boundary conditions driving one run. All arrays have one
/// entry per timestep; temperatures are in Kelvin, gains in W, irradiance in
/// W/m² and the air exchange rate in 1/h.
#[derive(Clone, Debug, Deserialize)]
pub struct BoundaryTimeSeries {
    /// Equivalent outdoor temperature driving the outer branch (air
    /// temperature combined with short- and long-wave effects on the
    /// envelope).
    pub equal_air_temp: Vec<f64>,
    /// Outdoor air temperature supplying ventilation/infiltration.
    pub outdoor_air_temp: Vec<f64>,
    /// Solar irradiance reaching the transparent areas, one row per
    /// timestep with one entry per facade segment.
    pub solar_rad_in: Vec<Vec<f64>>,
    /// Radiative internal gains (people, lighting, radiant equipment).
    pub internal_gains_rad: Vec<f64>,
    /// Convective internal gains.
    pub internal_gains: Vec<f64>,
    /// Additional convective source terms (appliances, processes).
    pub internal_heat_sources: Vec<f64>,
    /// Air exchange rate with the outdoor environment.
    pub vent_rate: Vec<f64>,
}

impl BoundaryTimeSeries {
    /// Boundary series holding both driving temperatures at a constant value
    /// with no solar, no internal gains and no ventilation, as the VDI 6007
    /// verification cases are set up.
    pub fn constant(timesteps: usize, facade_count: usize, temp: f64) -> Self {
        Self {
            equal_air_temp: vec![temp; timesteps],
            outdoor_air_temp: vec![temp; timesteps],
            solar_rad_in: vec![vec![0.0; facade_count]; timesteps],
            internal_gains_rad: vec![0.0; timesteps],
            internal_gains: vec![0.0; timesteps],
            internal_heat_sources: vec![0.0; timesteps],
            vent_rate: vec![0.0; timesteps],
        }
    }

    pub(crate) fn validate(
        &self,
        timesteps: usize,
        facade_count: usize,
    ) -> Result<(), InvalidSetpoints> {
        InvalidSetpoints::check_length("equal_air_temp", self.equal_air_temp.len(), timesteps)?;
        InvalidSetpoints::check_length("outdoor_air_temp", self.outdoor_air_temp.len(), timesteps)?;
        InvalidSetpoints::check_length("solar_rad_in", self.solar_rad_in.len(), timesteps)?;
        InvalidSetpoints::check_length(
            "internal_gains_rad",
            self.internal_gains_rad.len(),
            timesteps,
        )?;
        InvalidSetpoints::check_length("internal_gains", self.internal_gains.len(), timesteps)?;
        InvalidSetpoints::check_length(
            "internal_heat_sources",
            self.internal_heat_sources.len(),
            timesteps,
        )?;
        InvalidSetpoints::check_length("vent_rate", self.vent_rate.len(), timesteps)?;
        for (step, row) in self.solar_rad_in.iter().enumerate() {
            if row.len() != facade_count {
                return Err(InvalidSetpoints::FacadeCountMismatch {
                    step,
                    expected: facade_count,
                    actual: row.len(),
                });
            }
        }
        Ok(())
    }
}
