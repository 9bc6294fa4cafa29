//! ADC conversion helpers
//!
//! Pure arithmetic on 10-bit conversion results. Register access lives
//! behind [`simplehal::AdcController`].

use simplehal::adc::{ADC_MAX_VALUE, VREFINT_VOLTS};

/// Supply voltage assumed when the reference reading is unusable
pub const DEFAULT_VDD: f32 = 3.3;

/// Convert a raw reading to volts against `vref`
pub fn to_voltage(raw: u16, vref: f32) -> f32 {
    raw as f32 / ADC_MAX_VALUE as f32 * vref
}

/// Convert a raw reading to percent of full scale
pub fn to_percent(raw: u16) -> f32 {
    raw as f32 / ADC_MAX_VALUE as f32 * 100.0
}

/// Supply voltage from a raw internal reference reading
///
/// Returns [`DEFAULT_VDD`] when `vrefint_raw` is 0.
pub fn vdd_from_vrefint(vrefint_raw: u16) -> f32 {
    if vrefint_raw == 0 {
        return DEFAULT_VDD;
    }
    VREFINT_VOLTS * ADC_MAX_VALUE as f32 / vrefint_raw as f32
}

/// Raw reading to volts, compensated with a measured supply voltage
pub fn to_voltage_compensated(raw: u16, vrefint_raw: u16) -> f32 {
    to_voltage(raw, vdd_from_vrefint(vrefint_raw))
}

/// Battery charge estimate, linear between `v_min` and `v_max`
///
/// Clamped to 0..=100.
pub fn battery_percent(vdd: f32, v_min: f32, v_max: f32) -> f32 {
    if v_max <= v_min {
        return if vdd >= v_max { 100.0 } else { 0.0 };
    }
    ((vdd - v_min) / (v_max - v_min) * 100.0).clamp(0.0, 100.0)
}

/// Integer mean of a sample buffer (0 when empty)
pub fn average(samples: &[u16]) -> u16 {
    if samples.is_empty() {
        return 0;
    }
    let sum: u32 = samples.iter().map(|&s| s as u32).sum();
    (sum / samples.len() as u32) as u16
}
