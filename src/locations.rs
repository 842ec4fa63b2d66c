/// Known auction centre registry.
///
/// Staging subdirectory names map to a display name, region, and default
/// currency. Unknown locations still flow through the pipeline with a
/// title-cased display name and the INR default.
pub struct LocationProfile {
    pub display_name: &'static str,
    pub region: &'static str,
    pub default_currency: &'static str,
}

const KNOWN_LOCATIONS: &[(&str, LocationProfile)] = &[
    (
        "kolkata",
        LocationProfile {
            display_name: "Kolkata",
            region: "India",
            default_currency: "INR",
        },
    ),
    (
        "guwahati",
        LocationProfile {
            display_name: "Guwahati",
            region: "India",
            default_currency: "INR",
        },
    ),
    (
        "siliguri",
        LocationProfile {
            display_name: "Siliguri",
            region: "India",
            default_currency: "INR",
        },
    ),
    (
        "cochin",
        LocationProfile {
            display_name: "Cochin",
            region: "India",
            default_currency: "INR",
        },
    ),
    (
        "colombo",
        LocationProfile {
            display_name: "Colombo",
            region: "Sri Lanka",
            default_currency: "LKR",
        },
    ),
    (
        "mombasa",
        LocationProfile {
            display_name: "Mombasa",
            region: "Kenya",
            default_currency: "KES",
        },
    ),
];

pub fn profile(location: &str) -> Option<&'static LocationProfile> {
    let key = location.to_ascii_lowercase();
    KNOWN_LOCATIONS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, profile)| profile)
}

/// Display name for a location, title-casing unknown ones.
pub fn display_name(location: &str) -> String {
    match profile(location) {
        Some(p) => p.display_name.to_string(),
        None => {
            let mut chars = location.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

pub fn region(location: &str) -> String {
    profile(location)
        .map(|p| p.region.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn default_currency(location: &str) -> &'static str {
    profile(location).map(|p| p.default_currency).unwrap_or("INR")
}
