use log::info;

/// Vendor signature substrings and the model they identify. The list is
/// ordered: a specific model signature must come before its vendor-family
/// prefix (XMX5LGBBFG10 before XMX5LG), first match wins.
pub const METER_SIGNATURES: &[(&str, &str)] = &[
    ("FLU5\\", "Siconia"),
    ("ISK5\\2M550E-1011", "ISKRA AM550e-1011"),
    ("KFM5KAIFA-METER", "Kaifa (MA105 of MA304)"),
    ("XMX5LGBBFG10", "Landis + Gyr E350"),
    ("XMX5LG", "Landis + Gyr"),
    ("Ene5\\T210-D", "Sagemcom T210-D"),
];

pub fn lookup_meter(identification: &str) -> Option<&'static str> {
    METER_SIGNATURES
        .iter()
        .find(|(signature, _)| identification.contains(signature))
        .map(|&(_, name)| name)
}

/// Resolves the meter model from the identification line captured at cycle
/// start. Evaluated once per boot; the cached name is never re-evaluated,
/// even if a later telegram carries a different identification string.
#[derive(Debug, Default)]
pub struct MeterIdentifier {
    name: Option<String>,
}

impl MeterIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, identification_line: &str) {
        if self.name.is_some() {
            return;
        }
        let name = lookup_meter(identification_line).unwrap_or("Unknown");
        info!("[P1] Meter identified as {}", name);
        self.name = Some(name.to_string());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_kaifa() {
        assert_eq!(
            lookup_meter("/KFM5KAIFA-METER"),
            Some("Kaifa (MA105 of MA304)")
        );
    }

    #[test]
    fn test_specific_signature_wins_over_family_prefix() {
        // contains both XMX5LGBBFG10 and its prefix XMX5LG
        assert_eq!(lookup_meter("/XMX5LGBBFG10"), Some("Landis + Gyr E350"));
        assert_eq!(lookup_meter("/XMX5LGF0010"), Some("Landis + Gyr"));
    }

    #[test]
    fn test_lookup_unknown() {
        assert_eq!(lookup_meter("/ACME123"), None);
    }

    #[test]
    fn test_capture_is_cached() {
        let mut id = MeterIdentifier::new();
        id.capture("/KFM5KAIFA-METER");
        assert_eq!(id.name(), Some("Kaifa (MA105 of MA304)"));
        // a different identification later must not change the name
        id.capture("/XMX5LGBBFG10");
        assert_eq!(id.name(), Some("Kaifa (MA105 of MA304)"));
    }

    #[test]
    fn test_capture_unknown_is_still_cached() {
        let mut id = MeterIdentifier::new();
        id.capture("/ACME123");
        assert_eq!(id.name(), Some("Unknown"));
        id.capture("/KFM5KAIFA-METER");
        assert_eq!(id.name(), Some("Unknown"));
    }
}
