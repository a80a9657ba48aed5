//! Region allow-lists and label canonicalisation.
//!
//! Lookup services and hand-typed sheets spell the same state several ways
//! (`"UP"`, `"U.P."`, `"Uttar Pradesh"`), so every label passes through
//! [`canonicalize_region`] before it is counted or matched.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::UNKNOWN_REGION;

/// Hindi-medium regions in report order.
pub const HINDI_MEDIUM_REGIONS: &[&str] = &[
    "Uttar Pradesh",
    "Gujarat",
    "Jharkhand",
    "Rajasthan",
    "Madhya Pradesh",
    "Haryana",
    "Himachal Pradesh",
];

/// English-medium regions in report order.
pub const ENGLISH_MEDIUM_REGIONS: &[&str] = &[
    "Telangana",
    "Andhra Pradesh",
    "Manipur",
    "Mizoram",
    "Tripura",
];

/// Every state and union territory the resolver is expected to return.
const KNOWN_REGIONS: &[&str] = &[
    "Andaman and Nicobar Islands",
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chandigarh",
    "Chhattisgarh",
    "Dadra and Nagar Haveli and Daman and Diu",
    "Delhi",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jammu and Kashmir",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Ladakh",
    "Lakshadweep",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Puducherry",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

/// Lower-case alias → canonical name.
const ALIASES: &[(&str, &str)] = &[
    ("up", "Uttar Pradesh"),
    ("u.p.", "Uttar Pradesh"),
    ("u.p", "Uttar Pradesh"),
    ("mp", "Madhya Pradesh"),
    ("m.p.", "Madhya Pradesh"),
    ("hp", "Himachal Pradesh"),
    ("h.p.", "Himachal Pradesh"),
    ("ap", "Andhra Pradesh"),
    ("a.p.", "Andhra Pradesh"),
    ("ts", "Telangana"),
    ("orissa", "Odisha"),
    ("pondicherry", "Puducherry"),
    ("uttaranchal", "Uttarakhand"),
    ("national capital territory of delhi", "Delhi"),
    ("nct of delhi", "Delhi"),
    ("new delhi", "Delhi"),
    ("jammu & kashmir", "Jammu and Kashmir"),
    ("andaman & nicobar islands", "Andaman and Nicobar Islands"),
];

/// Normalise a raw region label.
///
/// Whitespace is trimmed and collapsed, aliases are expanded, and known
/// names come back in their canonical spelling. Unrecognised labels are
/// kept (whitespace-normalised) so they still show up under "Other".
/// Empty input yields [`UNKNOWN_REGION`].
pub fn canonicalize_region(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return UNKNOWN_REGION.to_string();
    }

    let lower = collapsed.to_lowercase();
    if lower == UNKNOWN_REGION.to_lowercase() {
        return UNKNOWN_REGION.to_string();
    }
    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return (*canonical).to_string();
    }
    if let Some(known) = KNOWN_REGIONS.iter().find(|k| k.to_lowercase() == lower) {
        return (*known).to_string();
    }

    collapsed
}

/// Find a known region mentioned by full name inside free text.
///
/// Aliases are not matched here; short codes like `"up"` occur inside
/// ordinary words. Names match as whole words, case-insensitively, and the
/// longest matching name wins.
pub fn region_in_text(text: &str) -> Option<&'static str> {
    region_patterns()
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
        .max_by_key(|name| name.len())
}

/// One case-insensitive, word-bounded pattern per known region.
fn region_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        KNOWN_REGIONS
            .iter()
            .filter_map(|name| {
                let words: Vec<String> = name.split_whitespace().map(regex::escape).collect();
                let pattern = format!(r"(?i)\b{}\b", words.join(r"\s+"));
                Regex::new(&pattern).ok().map(|re| (*name, re))
            })
            .collect()
    })
}

/// `true` when `region` is one of the known states / territories.
pub fn is_known_region(region: &str) -> bool {
    KNOWN_REGIONS.contains(&region)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
