use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of one physical telegram line. Longer lines are truncated
/// at this bound, excess bytes are dropped.
pub const MAX_LINE_LEN: usize = 1024;

/// Hard capacity of the accumulating telegram buffer. Exceeding it before the
/// end marker invalidates the cycle.
pub const TELEGRAM_CAPACITY: usize = 2048;

/// Maximum length of the bounded text fields (equipment ids, timestamp,
/// version). Assignment truncates, it never fails.
pub const TEXT_FIELD_MAX: usize = 64;

/// One logical read cycle at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Disabled,
    Waiting,
    Reading,
    Done,
    Fault,
}

/// A metering value with the exact digit sequence and decimal point position
/// as read from the wire. No float conversion happens in the core, so values
/// like `992.992` round-trip without rounding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixedValue(String);

impl FixedValue {
    pub fn new(digits: String) -> Self {
        FixedValue(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Float view for sinks that need arithmetic. The core never calls this.
    pub fn as_f64(&self) -> Option<f64> {
        self.0.parse::<f64>().ok()
    }
}

impl From<String> for FixedValue {
    fn from(digits: String) -> Self {
        FixedValue(digits)
    }
}

impl fmt::Display for FixedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Truncating assignment for the bounded text fields.
pub fn assign_bounded(dst: &mut String, src: &str, max: usize) {
    dst.clear();
    let mut end = src.len().min(max);
    while end > 0 && !src.is_char_boundary(end) {
        end -= 1;
    }
    dst.push_str(&src[..end]);
}

/// The decoded measurement snapshot. Fields are updated independently as
/// their line arrives in a telegram; a field absent from a vendor's telegram
/// keeps its previous value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub p1_version: String,
    pub p1_timestamp: String,
    pub equipment_id: String,
    pub equipment_id_gas: String,
    pub equipment_id_water: String,

    pub electricity_used_tariff1: FixedValue,
    pub electricity_used_tariff2: FixedValue,
    pub electricity_returned_tariff1: FixedValue,
    pub electricity_returned_tariff2: FixedValue,

    /// 1: high/normal, 2: low
    pub tariff_indicator: u32,

    pub active_energy_average_demand: FixedValue,
    pub active_energy_max_demand_month: FixedValue,

    pub actual_power_delivered: FixedValue,
    pub actual_power_returned: FixedValue,
    pub active_power_l1_plus: FixedValue,
    pub active_power_l2_plus: FixedValue,
    pub active_power_l3_plus: FixedValue,
    pub active_power_l1_minus: FixedValue,
    pub active_power_l2_minus: FixedValue,
    pub active_power_l3_minus: FixedValue,

    pub instantaneous_voltage_l1: FixedValue,
    pub instantaneous_voltage_l2: FixedValue,
    pub instantaneous_voltage_l3: FixedValue,
    pub instantaneous_current_l1: FixedValue,
    pub instantaneous_current_l2: FixedValue,
    pub instantaneous_current_l3: FixedValue,

    pub voltage_sags_l1: u32,
    pub voltage_sags_l2: u32,
    pub voltage_sags_l3: u32,
    pub voltage_swells_l1: u32,
    pub voltage_swells_l2: u32,
    pub voltage_swells_l3: u32,
    pub power_failures: u32,
    pub long_power_failures: u32,
    pub long_power_failures_log: String,

    pub gas_received_5min: FixedValue,
    pub water_received_5min: FixedValue,

    /// Set when the cycle that produced this snapshot completed.
    pub received_at: Option<DateTime<Utc>>,
}
