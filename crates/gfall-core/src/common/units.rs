use super::constants::{ANGSTROM_PER_NM, GFALL_AIR_THRESHOLD_NM, HC_EV_CM};
use crate::domain::Medium;

pub fn wavenumber_to_ev(wavenumber: f64) -> f64 {
    wavenumber * HC_EV_CM
}

pub fn ev_to_wavenumber(energy: f64) -> f64 {
    energy / HC_EV_CM
}

pub fn nm_to_angstrom(wavelength: f64) -> f64 {
    wavelength * ANGSTROM_PER_NM
}

/// Medium of a tabulated gfall wavelength; the threshold itself is vacuum.
pub fn medium_for_wavelength_nm(wavelength: f64, threshold: f64) -> Medium {
    if wavelength <= threshold {
        Medium::Vacuum
    } else {
        Medium::Air
    }
}

pub fn gfall_medium(wavelength: f64) -> Medium {
    medium_for_wavelength_nm(wavelength, GFALL_AIR_THRESHOLD_NM)
}

/// Air to vacuum wavelength, both in Angstrom (VALD/Morton refraction formula).
pub fn air_to_vacuum_angstrom(wavelength: f64) -> f64 {
    let sigma2 = (1.0e4 / wavelength).powi(2);
    let factor = 1.0 + 5.792_105e-2 / (238.018_5 - sigma2) + 1.679_17e-3 / (57.362 - sigma2);
    wavelength * factor
}
