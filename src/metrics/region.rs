//! Region code table: lower-cased U.S. state name to two-letter postal code.

use lazy_static::lazy_static;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

const STATES: [(&str, &str); 50] = [
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
];

lazy_static! {
    static ref NAME_TO_CODE: HashMap<&'static str, &'static str> = STATES.iter().copied().collect();
    static ref CODE_TO_NAME: HashMap<&'static str, &'static str> =
        STATES.iter().map(|&(name, code)| (code, name)).collect();
}

/// Postal code for a state name. Matching ignores case and surrounding space.
pub fn region_code(name: &str) -> Option<&'static str> {
    NAME_TO_CODE.get(name.trim().to_lowercase().as_str()).copied()
}

/// Lower-cased state name for a postal code.
pub fn region_name(code: &str) -> Option<&'static str> {
    CODE_TO_NAME.get(code.trim().to_uppercase().as_str()).copied()
}

pub fn region_count() -> usize {
    NAME_TO_CODE.len()
}

/// Re-key a name-keyed mapping by postal code. Names without a code are
/// dropped; names that resolve to the same code (`"Texas"`, `"texas"`) have
/// their values added together.
pub fn region_code_translate<K, V, I>(values: I) -> BTreeMap<String, V>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AddAssign,
{
    let mut out = BTreeMap::new();
    for (name, value) in values {
        let Some(code) = region_code(name.as_ref()) else {
            continue;
        };
        match out.entry(code.to_string()) {
            Entry::Occupied(mut e) => *e.get_mut() += value,
            Entry::Vacant(e) => {
                e.insert(value);
            }
        }
    }
    out
}
