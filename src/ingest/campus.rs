// src/ingest/campus.rs
//! Campus inference from free-text locations.
//!
//! Precedence: empty → TBD prefix → online keyword → campus keyword (in
//! declaration order) → known off-campus venue → Unknown.

use crate::ingest::types::Campus;

pub const CAMPUS_KEYWORDS: &[(Campus, &[&str])] = &[
    (
        Campus::CollegeAve,
        &[
            "Student Center",
            "Scott Hall",
            "College Ave",
            "Voorhees",
            "Old Queens",
            "Zimmerli",
            "Hillel",
            "Academic Building",
            "Murray Hall",
            "Demarest",
            "Paul Robeson",
            "Hardenbergh",
            "Clothier",
            "Seminary",
            "Eagleton",
            "CASC",
            "Silvers",
            "Catholic Center",
            "Linguistic",
            "Civic Square",
            "St. Peter",
            "Little Theatre",
            "Women's House",
            "Alexander Library",
            "Nicholas Music",
            "McCormick",
            "Bloustein",
            "SC&I",
            "RU Cinema",
            "Art History",
            "Loree",
            "French Seminar",
            "Student Activities Center",
        ],
    ),
    (
        Campus::Livingston,
        &[
            "RAC",
            "Jersey Mike",
            "Tillett",
            "Tillet",
            "Livi",
            "Livingston",
            "RBS",
            "Ludwig",
            "Lucy Stone",
            "Hatchery",
            "The Yard",
            "Graduate Student Lounge",
            "The Cage",
            "Richardson",
            "DSC Lounge",
        ],
    ),
    (
        Campus::Busch,
        &[
            "Werblin",
            "Busch",
            "Hill Center",
            "SERC",
            "BSC",
            "BME",
            "Biomedical Engineering",
            "Serin",
            "Richard Weeks",
            "Research Tower",
            "Proteomics",
            "Life Science",
            "CoRE",
            "Rutgers Golf",
        ],
    ),
    (
        Campus::CookDouglass,
        &[
            "Cook",
            "Douglass",
            "Hickman",
            "Passion Puddle",
            "Ruth Adams",
            "Marine and Coastal Sciences",
            "ENR",
            "Rutgers Botanical",
            "ABE",
        ],
    ),
];

pub const ONLINE_KEYWORDS: &[&str] = &["zoom", "online", "virtual", "teams", "webinar"];

/// Checked as prefixes only: "TBD - Busch" is still unknown.
pub const TBD_PATTERNS: &[&str] = &["tbd", "to be determined", "to be announced", "tba"];

pub const OFF_CAMPUS_KEYWORDS: &[&str] = &[
    "Eastern Star Rehabilitation",
    "Mitsuwa",
    "Liberty Science Center",
    "United Nations",
    "Utica University",
    "Buccleuch",
    "Johnson Park",
    "New Orleans",
    "Jersey City",
    "New York City",
    "Newark",
];

fn contains_ci(haystack_lower: &str, needle: &str) -> bool {
    haystack_lower.contains(&needle.to_lowercase())
}

pub fn infer_campus(location: Option<&str>) -> Campus {
    let Some(loc) = location.filter(|s| !s.is_empty()) else {
        return Campus::Unknown;
    };
    let lower = loc.to_lowercase();

    if TBD_PATTERNS.iter().any(|p| lower.starts_with(p)) {
        return Campus::Unknown;
    }

    if ONLINE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Campus::Online;
    }

    for (campus, keywords) in CAMPUS_KEYWORDS {
        if keywords.iter().any(|kw| contains_ci(&lower, kw)) {
            return *campus;
        }
    }

    if OFF_CAMPUS_KEYWORDS.iter().any(|kw| contains_ci(&lower, kw)) {
        return Campus::OffCampus;
    }

    Campus::Unknown
}
