//! County list shaping: placeholder filtering, ordering and search.

use crate::models::County;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Name prefix the backend uses for counties that only exist as a code.
const PLACEHOLDER_PREFIX: &str = "县代码";

/// Province value used for unknown provinces.
const UNKNOWN_PROVINCE: &str = "未知";

/// Whether the county has a real name rather than a code-only placeholder.
pub fn is_displayable(county: &County) -> bool {
    county
        .name
        .as_deref()
        .is_some_and(|n| !n.is_empty() && !n.starts_with(PLACEHOLDER_PREFIX))
}

/// Default list order: exited counties first by exit year, then by
/// completeness score (highest first), then by name.
pub fn compare_counties(a: &County, b: &County) -> Ordering {
    let by_exit = match (a.exit_year, b.exit_year) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_exit
        .then_with(|| {
            let sa = a.completeness_score.unwrap_or(f64::NEG_INFINITY);
            let sb = b.completeness_score.unwrap_or(f64::NEG_INFINITY);
            sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.name.as_deref().unwrap_or("").cmp(b.name.as_deref().unwrap_or("")))
}

/// Drop placeholders, sort, and keep the first `limit` counties.
pub fn shape_county_list(counties: Vec<County>, limit: usize) -> Vec<County> {
    let mut shaped: Vec<County> = counties.into_iter().filter(is_displayable).collect();
    shaped.sort_by(compare_counties);
    shaped.truncate(limit);
    shaped
}

/// Case-insensitive substring match on the county name or province.
pub fn search_counties<'a>(counties: &'a [County], keyword: &str) -> Vec<&'a County> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return counties.iter().collect();
    }

    let matches = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains(&keyword))
    };

    counties
        .iter()
        .filter(|c| matches(&c.name) || matches(&c.province))
        .collect()
}

/// Distinct known provinces, sorted.
pub fn distinct_provinces(counties: &[County]) -> Vec<String> {
    counties
        .iter()
        .filter_map(|c| c.province.as_deref())
        .filter(|p| !p.is_empty() && *p != UNKNOWN_PROVINCE)
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
