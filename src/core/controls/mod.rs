pub mod hvac_dispatch;
