use super::structs::MAX_LINE_LEN;

/// Truncate a physical line at the line bound without splitting a character.
pub fn truncate_line(line: &str) -> &str {
    if line.len() <= MAX_LINE_LEN {
        return line;
    }
    let mut end = MAX_LINE_LEN;
    while end > 0 && !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Content of the first parenthesis group with leading zeros compressed.
///
/// `rest` starts at the opening `(`. The scan stops at `)` or at the end of
/// the line, whichever comes first.
///
/// Example: `(0001)` -> `1`, `(50221)` -> `50221`
pub fn first_group_compressed(rest: &str) -> String {
    let inner = rest.strip_prefix('(').unwrap_or(rest);
    let mut value = String::new();
    let mut leading_zero = true;
    for c in inner.chars() {
        if c == ')' {
            break;
        }
        if leading_zero && c == '0' {
            continue;
        }
        leading_zero = false;
        value.push(c);
    }
    value
}

/// Digits of a scaled numeric group, up to the `*` unit marker, with leading
/// zeros compressed. A zero immediately followed by `.` is not a leading
/// zero, so `(00.000*kW)` yields `0.000` and `(000992.992*kWh)` yields
/// `992.992`.
///
/// `rest` starts at the opening `(`. The scan also stops at `)` or at the end
/// of the line, so a group missing its unit marker yields what was collected
/// instead of running past the line.
pub fn until_star(rest: &str) -> String {
    let inner = rest.strip_prefix('(').unwrap_or(rest);
    let mut value = String::new();
    let mut leading_zero = true;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' || c == ')' {
            break;
        }
        if leading_zero && c != '0' {
            leading_zero = false;
        }
        if c == '0' && chars.peek() == Some(&'.') {
            leading_zero = false;
        }
        if !leading_zero {
            value.push(c);
        }
    }
    value
}

/// Scaled numeric value of the second group in a `(meta)(value*unit)` form.
/// Returns None when there is no second group on the line.
pub fn double_group_value(rest: &str) -> Option<String> {
    let boundary = rest.find(")(")?;
    Some(until_star(&rest[boundary + 1..]))
}

/// First parenthesis group parsed as a plain integer. An all-zero group
/// compresses to the empty string and counts as 0; anything non-numeric is
/// rejected so the field can be skipped.
pub fn parse_counter(rest: &str) -> Option<u32> {
    let value = first_group_compressed(rest);
    if value.is_empty() {
        return Some(0);
    }
    value.parse::<u32>().ok()
}

/// CRC16 as defined for the telegram envelope (polynomial 0xA001, init 0,
/// computed over `/` through `!` inclusive).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_group_compressed() {
        assert_eq!(first_group_compressed("(50221)"), "50221");
        assert_eq!(first_group_compressed("(0001)"), "1");
        assert_eq!(first_group_compressed("(0000)"), "");
        assert_eq!(first_group_compressed("(200512135409S)"), "200512135409S");
    }

    #[test]
    fn test_first_group_without_closing_paren() {
        // truncated line, scan stops at the end instead of overrunning
        assert_eq!(first_group_compressed("(50221"), "50221");
        assert_eq!(first_group_compressed("("), "");
    }

    #[test]
    fn test_until_star_leading_zero_compression() {
        assert_eq!(until_star("(000992.992*kWh)"), "992.992");
        assert_eq!(until_star("(00.000*kW)"), "0.000");
        assert_eq!(until_star("(232.0*V)"), "232.0");
        assert_eq!(until_star("(0.95)"), "0.95");
    }

    #[test]
    fn test_until_star_missing_marker() {
        assert_eq!(until_star("(001.234"), "1.234");
        assert_eq!(until_star(""), "");
    }

    #[test]
    fn test_double_group_value() {
        assert_eq!(
            double_group_value("(231029141500W)(05446.465*m3)"),
            Some("5446.465".to_string())
        );
        assert_eq!(double_group_value("(231029141500W)"), None);
        assert_eq!(double_group_value(""), None);
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("(00051)"), Some(51));
        assert_eq!(parse_counter("(00000)"), Some(0));
        assert_eq!(parse_counter("(bogus)"), None);
    }

    #[test]
    fn test_crc16_check_value() {
        // standard CRC16/ARC check value
        assert_eq!(crc16(b"123456789"), 0xBB3D);
    }

    #[test]
    fn test_truncate_line() {
        let long = "x".repeat(MAX_LINE_LEN + 50);
        assert_eq!(truncate_line(&long).len(), MAX_LINE_LEN);
        assert_eq!(truncate_line("short"), "short");
    }
}
