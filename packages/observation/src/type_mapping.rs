//! Category mapping utilities.
//!
//! Maps source-specific category labels (NIBRS offense names, city codes)
//! to the three-way [`Category`] used by the statistics store. Sources use
//! different naming conventions, so matching is keyword based.

use risk_map_observation_models::Category;

const VIOLENT_KEYWORDS: &[&str] = &[
    "assault",
    "homicide",
    "murder",
    "manslaughter",
    "robbery",
    "rape",
    "sexual",
    "battery",
    "kidnapping",
];

const PROPERTY_KEYWORDS: &[&str] = &[
    "theft",
    "burglary",
    "larceny",
    "shoplifting",
    "stolen",
    "vandalism",
    "arson",
    "criminal mischief",
    "breaking and entering",
];

/// Maps a raw category label to its [`Category`].
///
/// Matching is case-insensitive. Violent keywords are checked first since
/// labels such as `"ROBBERY - THEFT FROM PERSON"` contain both. Anything
/// unrecognized, including the empty string, maps to [`Category::Other`].
#[must_use]
pub fn map_category(raw: &str) -> Category {
    let lower = raw.to_lowercase();

    if contains_any(&lower, VIOLENT_KEYWORDS) {
        return Category::Violent;
    }
    if contains_any(&lower, PROPERTY_KEYWORDS) {
        return Category::Property;
    }

    Category::Other
}

/// Checks if `haystack` contains any of the given `needles`.
fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_dallas_nibrs_categories() {
        assert_eq!(map_category("ASSAULT"), Category::Violent);
        assert_eq!(map_category("HOMICIDE"), Category::Violent);
        assert_eq!(map_category("ROBBERY"), Category::Violent);
        assert_eq!(map_category("THEFT"), Category::Property);
        assert_eq!(map_category("BURGLARY"), Category::Property);
        assert_eq!(map_category("AUTO THEFT"), Category::Property);
    }

    #[test]
    fn violent_wins_over_property() {
        assert_eq!(
            map_category("Robbery - theft from person"),
            Category::Violent
        );
    }

    #[test]
    fn unknown_fallback() {
        assert_eq!(map_category("DRUG/NARCOTIC VIOLATIONS"), Category::Other);
        assert_eq!(map_category(""), Category::Other);
        assert_eq!(map_category("OTHER"), Category::Other);
    }
}
