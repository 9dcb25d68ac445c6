use super::structs::{assign_bounded, FixedValue, MeasurementRecord, TEXT_FIELD_MAX};
use super::utils;
use lazy_static::lazy_static;
use log::warn;
use std::collections::HashMap;

/// Bounded text targets of the raw-text rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    P1Version,
    Timestamp,
    EquipmentId,
    EquipmentIdGas,
    EquipmentIdWater,
}

/// FixedValue targets of the scaled-numeric and double-group rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    UsedTariff1,
    UsedTariff2,
    ReturnedTariff1,
    ReturnedTariff2,
    AverageDemand,
    MaxDemandMonth,
    PowerDelivered,
    PowerReturned,
    PowerL1Plus,
    PowerL2Plus,
    PowerL3Plus,
    PowerL1Minus,
    PowerL2Minus,
    PowerL3Minus,
    VoltageL1,
    VoltageL2,
    VoltageL3,
    CurrentL1,
    CurrentL2,
    CurrentL3,
    Gas5Min,
    Water5Min,
}

/// Integer targets of the counter rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    TariffIndicator,
    SagsL1,
    SagsL2,
    SagsL3,
    SwellsL1,
    SwellsL2,
    SwellsL3,
    PowerFailures,
    LongPowerFailures,
}

/// Extraction rule selected by the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObisRule {
    /// First parenthesis group, leading zeros compressed, into a bounded
    /// text field.
    Text(TextField),
    /// Digits up to the `*` unit marker into a FixedValue.
    Scaled(NumericField),
    /// `(meta)(value*unit)`: skip the first group, scaled-numeric on the
    /// second.
    DoubleGroup(NumericField),
    /// First parenthesis group as a plain integer.
    Counter(CounterField),
    /// Rest of the line verbatim, for the long-power-failure event log.
    LogTail,
    /// Recognized and intentionally discarded.
    Ignore,
}

lazy_static! {
    /// Dispatch key -> extraction rule. The key is every digit of the
    /// hierarchical reference up to the first `(`, concatenated with the
    /// `-`/`:`/`.` separators dropped, so `1-0:1.8.1` dispatches as 10181.
    /// Two structurally different references whose digit sequences coincide
    /// would alias onto the same key; no such collision is known against
    /// real meters.
    static ref DISPATCH: HashMap<u32, ObisRule> = {
        use CounterField::*;
        use NumericField::*;
        use ObisRule::*;
        use TextField::*;
        let mut m = HashMap::new();

        m.insert(9614, Text(P1Version));        // 0-0:96.1.4   version information
        m.insert(9611, Text(EquipmentId));      // 0-0:96.1.1   equipment identifier electricity
        m.insert(100, Text(Timestamp));         // 0-0:1.0.0    YYMMDDhhmmssX
        m.insert(9612, Ignore);                 // 0-0:96.1.2   EAN code
        m.insert(1094321, Ignore);              // 1-0:94.32.1  grid type

        m.insert(10181, Scaled(UsedTariff1));    // 1-0:1.8.1
        m.insert(10182, Scaled(UsedTariff2));    // 1-0:1.8.2
        m.insert(10281, Scaled(ReturnedTariff1)); // 1-0:2.8.1
        m.insert(10282, Scaled(ReturnedTariff2)); // 1-0:2.8.2

        m.insert(96140, Counter(TariffIndicator)); // 0-0:96.14.0

        m.insert(10140, Scaled(AverageDemand));       // 1-0:1.4.0
        m.insert(10160, DoubleGroup(MaxDemandMonth)); // 1-0:1.6.0 (timestamp)(value*kW)
        m.insert(9810, Ignore);                       // 0-0:98.1.0 max demand history

        m.insert(10170, Scaled(PowerDelivered)); // 1-0:1.7.0
        m.insert(10270, Scaled(PowerReturned));  // 1-0:2.7.0
        m.insert(102170, Scaled(PowerL1Plus));   // 1-0:21.7.0
        m.insert(104170, Scaled(PowerL2Plus));   // 1-0:41.7.0
        m.insert(106170, Scaled(PowerL3Plus));   // 1-0:61.7.0
        m.insert(102270, Scaled(PowerL1Minus));  // 1-0:22.7.0
        m.insert(104270, Scaled(PowerL2Minus));  // 1-0:42.7.0
        m.insert(106270, Scaled(PowerL3Minus));  // 1-0:62.7.0

        m.insert(103270, Scaled(VoltageL1)); // 1-0:32.7.0
        m.insert(105270, Scaled(VoltageL2)); // 1-0:52.7.0
        m.insert(107270, Scaled(VoltageL3)); // 1-0:72.7.0
        m.insert(103170, Scaled(CurrentL1)); // 1-0:31.7.0
        m.insert(105170, Scaled(CurrentL2)); // 1-0:51.7.0
        m.insert(107170, Scaled(CurrentL3)); // 1-0:71.7.0

        m.insert(1032320, Counter(SagsL1));   // 1-0:32.32.0
        m.insert(1052320, Counter(SagsL2));   // 1-0:52.32.0
        m.insert(1072320, Counter(SagsL3));   // 1-0:72.32.0
        m.insert(1032360, Counter(SwellsL1)); // 1-0:32.36.0
        m.insert(1052360, Counter(SwellsL2)); // 1-0:52.36.0
        m.insert(1072360, Counter(SwellsL3)); // 1-0:72.36.0
        m.insert(96721, Counter(PowerFailures));    // 0-0:96.7.21
        m.insert(9679, Counter(LongPowerFailures)); // 0-0:96.7.9
        m.insert(1099970, LogTail);                 // 1-0:99.97.0

        // breaker states, thresholds, text messages
        m.insert(96310, Ignore);  // 0-0:96.3.10
        m.insert(196310, Ignore); // 0-1:96.3.10
        m.insert(296310, Ignore); // 0-2:96.3.10
        m.insert(396310, Ignore); // 0-3:96.3.10
        m.insert(496310, Ignore); // 0-4:96.3.10
        m.insert(1700, Ignore);   // 0-0:17.0.0   limiter threshold
        m.insert(103140, Ignore); // 1-0:31.4.0   fuse supervision threshold
        m.insert(96130, Ignore);  // 0-0:96.13.0  text message
        m.insert(96131, Ignore);  // 0-0:96.13.1  consumer message code
        m.insert(13028, Ignore);  // 1-3:0.2.8    version information
        m.insert(2410, Ignore);   // 0-n:24.1.0   device type

        // gas channel
        m.insert(12410, Ignore);                 // 0-1:24.1.0 device type
        m.insert(12420, Ignore);                 // 0-1:24.2.0 M-Bus device type
        m.insert(19610, Text(EquipmentIdGas));   // 0-1:96.1.0
        m.insert(19611, Text(EquipmentIdGas));   // 0-1:96.1.1
        m.insert(19612, Ignore);                 // 0-1:96.1.2
        m.insert(12421, DoubleGroup(Gas5Min));   // 0-1:24.2.1 last 5-minute value
        m.insert(12423, DoubleGroup(Gas5Min));   // 0-1:24.2.3 not temperature converted
        m.insert(12424, Ignore);                 // 0-1:24.2.4 breaker state

        // water channel
        m.insert(22410, Ignore);                 // 0-2:24.1.0 device type
        m.insert(22420, Ignore);                 // 0-2:24.2.0 M-Bus device type
        m.insert(29610, Text(EquipmentIdWater)); // 0-2:96.1.0
        m.insert(29611, Text(EquipmentIdWater)); // 0-2:96.1.1
        m.insert(29612, Ignore);                 // 0-2:96.1.2
        m.insert(22421, DoubleGroup(Water5Min)); // 0-2:24.2.1 last 5-minute value
        m.insert(22423, DoubleGroup(Water5Min)); // 0-2:24.2.3 not temperature converted

        m
    };
}

/// Collect the digits of the reference up to the first `(` into the dispatch
/// key. Returns the key and the byte offset of the `(`, or None when there is
/// no parenthesis group on the line.
fn dispatch_key(line: &str) -> Option<(u32, usize)> {
    let mut digits = String::new();
    for (offset, c) in line.char_indices() {
        if c == '(' {
            let key = if digits.is_empty() {
                0
            } else {
                digits.parse::<u32>().ok()?
            };
            return Some((key, offset));
        }
        if c.is_ascii_digit() {
            digits.push(c);
        }
    }
    None
}

fn numeric_slot(record: &mut MeasurementRecord, field: NumericField, inverse_tariff: bool) -> &mut FixedValue {
    use NumericField::*;
    // tariff inversion redirects the tariff-1 slot to tariff-2 and back,
    // applied at the moment of assignment
    let field = if inverse_tariff {
        match field {
            UsedTariff1 => UsedTariff2,
            UsedTariff2 => UsedTariff1,
            ReturnedTariff1 => ReturnedTariff2,
            ReturnedTariff2 => ReturnedTariff1,
            other => other,
        }
    } else {
        field
    };
    match field {
        UsedTariff1 => &mut record.electricity_used_tariff1,
        UsedTariff2 => &mut record.electricity_used_tariff2,
        ReturnedTariff1 => &mut record.electricity_returned_tariff1,
        ReturnedTariff2 => &mut record.electricity_returned_tariff2,
        AverageDemand => &mut record.active_energy_average_demand,
        MaxDemandMonth => &mut record.active_energy_max_demand_month,
        PowerDelivered => &mut record.actual_power_delivered,
        PowerReturned => &mut record.actual_power_returned,
        PowerL1Plus => &mut record.active_power_l1_plus,
        PowerL2Plus => &mut record.active_power_l2_plus,
        PowerL3Plus => &mut record.active_power_l3_plus,
        PowerL1Minus => &mut record.active_power_l1_minus,
        PowerL2Minus => &mut record.active_power_l2_minus,
        PowerL3Minus => &mut record.active_power_l3_minus,
        VoltageL1 => &mut record.instantaneous_voltage_l1,
        VoltageL2 => &mut record.instantaneous_voltage_l2,
        VoltageL3 => &mut record.instantaneous_voltage_l3,
        CurrentL1 => &mut record.instantaneous_current_l1,
        CurrentL2 => &mut record.instantaneous_current_l2,
        CurrentL3 => &mut record.instantaneous_current_l3,
        Gas5Min => &mut record.gas_received_5min,
        Water5Min => &mut record.water_received_5min,
    }
}

fn assign_counter(record: &mut MeasurementRecord, field: CounterField, value: u32, inverse_tariff: bool) {
    use CounterField::*;
    match field {
        TariffIndicator => {
            record.tariff_indicator = if inverse_tariff {
                match value {
                    1 => 2,
                    2 => 1,
                    other => other,
                }
            } else {
                value
            };
        }
        SagsL1 => record.voltage_sags_l1 = value,
        SagsL2 => record.voltage_sags_l2 = value,
        SagsL3 => record.voltage_sags_l3 = value,
        SwellsL1 => record.voltage_swells_l1 = value,
        SwellsL2 => record.voltage_swells_l2 = value,
        SwellsL3 => record.voltage_swells_l3 = value,
        PowerFailures => record.power_failures = value,
        LongPowerFailures => record.long_power_failures = value,
    }
}

fn assign_text(record: &mut MeasurementRecord, field: TextField, value: &str) {
    use TextField::*;
    let dst = match field {
        P1Version => &mut record.p1_version,
        Timestamp => &mut record.p1_timestamp,
        EquipmentId => &mut record.equipment_id,
        EquipmentIdGas => &mut record.equipment_id_gas,
        EquipmentIdWater => &mut record.equipment_id_water,
    };
    assign_bounded(dst, value, TEXT_FIELD_MAX);
}

/// Decode one telegram data line into the record. An unrecognized or
/// malformed line never aborts the telegram: the field is skipped and the
/// line logged.
pub fn parse_line(line: &str, record: &mut MeasurementRecord, inverse_tariff: bool) {
    let Some((key, open)) = dispatch_key(line) else {
        // no parenthesis group, nothing to extract
        return;
    };
    if key == 0 {
        return;
    }
    let rest = &line[open..];

    match DISPATCH.get(&key) {
        Some(ObisRule::Text(field)) => {
            let value = utils::first_group_compressed(rest);
            assign_text(record, *field, &value);
        }
        Some(ObisRule::Scaled(field)) => {
            *numeric_slot(record, *field, inverse_tariff) = FixedValue::new(utils::until_star(rest));
        }
        Some(ObisRule::DoubleGroup(field)) => match utils::double_group_value(rest) {
            Some(value) => {
                *numeric_slot(record, *field, inverse_tariff) = FixedValue::new(value);
            }
            None => warn!("[P1] Malformed double group line: {}", line),
        },
        Some(ObisRule::Counter(field)) => match utils::parse_counter(rest) {
            Some(value) => assign_counter(record, *field, value, inverse_tariff),
            None => warn!("[P1] Malformed counter line: {}", line),
        },
        Some(ObisRule::LogTail) => {
            record.long_power_failures_log = rest.to_string();
        }
        Some(ObisRule::Ignore) => {}
        None => {
            warn!("[P1] Unrecognized reference {} in line: {}", key, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str, record: &mut MeasurementRecord) {
        parse_line(line, record, false);
    }

    #[test]
    fn test_dispatch_key() {
        assert_eq!(dispatch_key("1-0:1.8.1(000100.500*kWh)"), Some((10181, 9)));
        assert_eq!(dispatch_key("0-0:1.0.0(200512135409S)"), Some((100, 9)));
        assert_eq!(dispatch_key("0-1:24.2.1(x)(y)"), Some((12421, 10)));
        assert_eq!(dispatch_key("no parenthesis"), None);
    }

    #[test]
    fn test_scaled_rule_used_tariff1() {
        let mut r = MeasurementRecord::default();
        parse("1-0:1.8.1(000992.992*kWh)", &mut r);
        assert_eq!(r.electricity_used_tariff1.as_str(), "992.992");
        assert!(r.electricity_used_tariff2.is_empty());
    }

    #[test]
    fn test_text_rule_timestamp_and_version() {
        let mut r = MeasurementRecord::default();
        parse("0-0:1.0.0(200512135409S)", &mut r);
        parse("0-0:96.1.4(50221)", &mut r);
        assert_eq!(r.p1_timestamp, "200512135409S");
        assert_eq!(r.p1_version, "50221");
    }

    #[test]
    fn test_text_rule_equipment_ids() {
        let mut r = MeasurementRecord::default();
        parse("0-0:96.1.1(3153414733313031303231363035)", &mut r);
        parse("0-1:96.1.0(37464C4F32313139303333373333)", &mut r);
        assert_eq!(r.equipment_id, "3153414733313031303231363035");
        assert_eq!(r.equipment_id_gas, "37464C4F32313139303333373333");
    }

    #[test]
    fn test_double_group_rule_gas() {
        let mut r = MeasurementRecord::default();
        parse("0-1:24.2.1(231029141500W)(05446.465*m3)", &mut r);
        assert_eq!(r.gas_received_5min.as_str(), "5446.465");
    }

    #[test]
    fn test_double_group_rule_water() {
        let mut r = MeasurementRecord::default();
        parse("0-2:24.2.3(200512134558S)(00872.234*m3)", &mut r);
        assert_eq!(r.water_received_5min.as_str(), "872.234");
    }

    #[test]
    fn test_max_demand_month_uses_second_group() {
        let mut r = MeasurementRecord::default();
        parse("1-0:1.6.0(200509134558S)(02.589*kW)", &mut r);
        assert_eq!(r.active_energy_max_demand_month.as_str(), "2.589");
    }

    #[test]
    fn test_counter_rule() {
        let mut r = MeasurementRecord::default();
        parse("1-0:32.32.0(00004)", &mut r);
        parse("0-0:96.7.21(00051)", &mut r);
        assert_eq!(r.voltage_sags_l1, 4);
        assert_eq!(r.power_failures, 51);
    }

    #[test]
    fn test_log_tail_rule() {
        let mut r = MeasurementRecord::default();
        parse(
            "1-0:99.97.0(2)(0-0:96.7.19)(101208152842W)(0000000240*s)",
            &mut r,
        );
        assert_eq!(
            r.long_power_failures_log,
            "(2)(0-0:96.7.19)(101208152842W)(0000000240*s)"
        );
    }

    #[test]
    fn test_unrecognized_key_does_not_touch_record() {
        let mut r = MeasurementRecord::default();
        parse("1-0:1.8.1(000100.500*kWh)", &mut r);
        parse("8-9:77.66.5(123)", &mut r);
        assert_eq!(r.electricity_used_tariff1.as_str(), "100.500");
    }

    #[test]
    fn test_malformed_counter_is_skipped() {
        let mut r = MeasurementRecord::default();
        r.power_failures = 7;
        parse("0-0:96.7.21(oops)", &mut r);
        assert_eq!(r.power_failures, 7);
    }

    #[test]
    fn test_tariff_inversion_swaps_energy_slots() {
        let mut r = MeasurementRecord::default();
        parse_line("1-0:1.8.1(000100.500*kWh)", &mut r, true);
        parse_line("1-0:2.8.2(000050.250*kWh)", &mut r, true);
        assert!(r.electricity_used_tariff1.is_empty());
        assert_eq!(r.electricity_used_tariff2.as_str(), "100.500");
        assert_eq!(r.electricity_returned_tariff1.as_str(), "50.250");
        assert!(r.electricity_returned_tariff2.is_empty());
    }

    #[test]
    fn test_tariff_inversion_rewrites_indicator() {
        let mut r = MeasurementRecord::default();
        parse_line("0-0:96.14.0(0001)", &mut r, true);
        assert_eq!(r.tariff_indicator, 2);
        parse_line("0-0:96.14.0(0002)", &mut r, true);
        assert_eq!(r.tariff_indicator, 1);
    }

    #[test]
    fn test_tariff_indicator_without_inversion() {
        let mut r = MeasurementRecord::default();
        parse_line("0-0:96.14.0(0002)", &mut r, false);
        assert_eq!(r.tariff_indicator, 2);
    }

    #[test]
    fn test_idempotent_decode() {
        let mut r = MeasurementRecord::default();
        parse("1-0:1.8.1(000992.992*kWh)", &mut r);
        let first = r.electricity_used_tariff1.clone();
        parse("1-0:1.8.1(000992.992*kWh)", &mut r);
        assert_eq!(r.electricity_used_tariff1, first);
    }
}
