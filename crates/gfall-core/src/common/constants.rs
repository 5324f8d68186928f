//! Physical constants and fixed thresholds of the gfall line list.
//!
//! SI defining values (exact since the 2019 redefinition) are combined into the
//! spectroscopic factors used when levels leave the pipeline in eV.

pub const PLANCK_JS: f64 = 6.626_070_15e-34_f64;
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0_f64;
pub const ELEMENTARY_CHARGE_C: f64 = 1.602_176_634e-19_f64;

/// h·c in eV·cm.
pub const HC_EV_CM: f64 = PLANCK_JS * SPEED_OF_LIGHT_M_S / ELEMENTARY_CHARGE_C * 1.0e2;
pub const INV_CM_PER_EV: f64 = 1.0 / HC_EV_CM;

pub const ANGSTROM_PER_NM: f64 = 10.0;

/// Wavelengths above this value (nm) are tabulated in air.
pub const GFALL_AIR_THRESHOLD_NM: f64 = 200.0;

pub const MAX_ATOMIC_NUMBER: u32 = 118;
