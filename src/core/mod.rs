pub mod controls;
pub mod thermal_response;
pub mod units;
