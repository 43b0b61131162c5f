//! Pure filter and dedup decision functions.
//!
//! Every function here is I/O-free and takes its configuration explicitly,
//! so drivers stay testable without a browser or store. Duplicate detection
//! against persisted records is the one store-touching check and lives in
//! the scrape pipeline instead.
//!
//! Parsing rules lean toward keeping postings: unparseable posted-times
//! count as fresh, unparseable salaries pass the floor, and unrecognized
//! locations count as USA. Losing a real posting is worse than surfacing a
//! borderline one.

use std::sync::LazyLock;

use regex::Regex;

pub mod salary;

pub use salary::{compare_salary_to_floor, parse_salary, ParsedSalary, PayPeriod, SalaryCheck};

/// Relative-time phrase: "3 hours ago", "2 days ago", "30+ days ago".
static RELATIVE_AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\+?\s*(second|minute|hour|day|week|month|year)").unwrap());

/// Compact age badge: "5d", "24h", "30d+", "2w".
static COMPACT_AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(h|d|w|mo)\+?$").unwrap());

/// Decide staleness from free-text posted-time.
///
/// Rules, in order:
/// 1. Seconds/minutes/hours (any count) are fresh.
/// 2. "N day(s)" is fresh iff N <= `threshold_days`.
/// 3. Weeks, months and years are always stale.
/// 4. "yesterday" counts as one day; "today"/"just now" as fresh.
/// 5. Anything unparseable is fresh. Ambiguous postings are never dropped.
pub fn is_stale(posted_text: &str, threshold_days: u32) -> bool {
    let lower = posted_text.to_lowercase();

    if lower.contains("yesterday") {
        return threshold_days < 1;
    }

    if let Some(caps) = RELATIVE_AGE.captures(&lower) {
        let count: u64 = match caps[1].parse() {
            Ok(n) => n,
            Err(_) => return false,
        };
        return match &caps[2] {
            "second" | "minute" | "hour" => false,
            "day" => count > u64::from(threshold_days),
            // A week is already past any sane threshold here.
            "week" | "month" | "year" => true,
            _ => false,
        };
    }

    // Badge shorthand some boards use instead of a phrase ("5d", "30d+").
    if let Some(caps) = COMPACT_AGE.captures(lower.trim()) {
        let count: u64 = match caps[1].parse() {
            Ok(n) => n,
            Err(_) => return false,
        };
        return match &caps[2] {
            "h" => false,
            "d" => count > u64::from(threshold_days),
            "w" | "mo" => true,
            _ => false,
        };
    }

    false
}

/// First denylisted keyword found in the title, case-insensitive substring
/// match. First match wins; the list is not ranked.
pub fn matches_ignored_keyword<'a>(title: &str, keywords: &'a [String]) -> Option<&'a str> {
    let lower = title.to_lowercase();
    keywords
        .iter()
        .find(|keyword| !keyword.is_empty() && lower.contains(&keyword.to_lowercase()))
        .map(String::as_str)
}

/// First denylisted domain found anywhere in the URL, case-insensitive.
pub fn matches_ignored_domain<'a>(url: &str, domains: &'a [String]) -> Option<&'a str> {
    let lower = url.to_lowercase();
    domains
        .iter()
        .find(|domain| !domain.is_empty() && lower.contains(&domain.to_lowercase()))
        .map(String::as_str)
}

/// US state postal codes plus DC. Matched against tokens that appear
/// uppercase in the source text, so "Bloomington, IN" matches Indiana while
/// "remote in Canada" does not.
const STATE_ABBREVS: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

const STATE_NAMES: &[&str] = &[
    "alabama", "alaska", "arizona", "arkansas", "california", "colorado", "connecticut",
    "delaware", "florida", "georgia", "hawaii", "idaho", "illinois", "indiana", "iowa",
    "kansas", "kentucky", "louisiana", "maine", "maryland", "massachusetts", "michigan",
    "minnesota", "mississippi", "missouri", "montana", "nebraska", "nevada", "new hampshire",
    "new jersey", "new mexico", "new york", "north carolina", "north dakota", "ohio",
    "oklahoma", "oregon", "pennsylvania", "rhode island", "south carolina", "south dakota",
    "tennessee", "texas", "utah", "vermont", "virginia", "washington", "west virginia",
    "wisconsin", "wyoming",
];

/// Phrases that positively identify a US location.
const US_PHRASES: &[&str] = &["united states", "u.s."];

/// Known non-US single-word tokens (countries and major tech-hub cities).
const NON_US_TOKENS: &[&str] = &[
    // Countries
    "canada", "uk", "england", "scotland", "wales", "ireland", "germany", "france", "spain",
    "portugal", "italy", "netherlands", "belgium", "switzerland", "austria", "sweden", "norway",
    "denmark", "finland", "poland", "czechia", "romania", "bulgaria", "ukraine", "russia",
    "india", "pakistan", "bangladesh", "china", "japan", "korea", "taiwan", "singapore",
    "philippines", "vietnam", "indonesia", "malaysia", "australia", "mexico", "brazil",
    "argentina", "colombia", "chile", "peru", "israel", "turkey", "egypt", "nigeria", "kenya",
    "uae", "dubai",
    // Cities
    "toronto", "vancouver", "montreal", "ottawa", "calgary", "london", "manchester",
    "edinburgh", "dublin", "berlin", "munich", "hamburg", "paris", "amsterdam", "madrid",
    "barcelona", "lisbon", "warsaw", "krakow", "prague", "bucharest", "kyiv", "bangalore",
    "bengaluru", "hyderabad", "mumbai", "delhi", "pune", "chennai", "noida", "gurgaon",
    "tokyo", "osaka", "seoul", "beijing", "shanghai", "shenzhen", "sydney", "melbourne",
    "brisbane", "auckland", "bogota", "medellin", "santiago", "lima",
    // Regions
    "europe", "emea", "apac", "latam", "asia", "africa", "oceania",
];

/// Known non-US multi-word phrases, substring-matched.
const NON_US_PHRASES: &[&str] = &[
    "united kingdom", "new zealand", "south africa", "south america", "latin america",
    "central america", "costa rica", "czech republic", "hong kong", "saudi arabia",
    "south korea", "tel aviv", "sao paulo", "mexico city", "buenos aires",
];

/// Heuristic USA check over free-text location.
///
/// US-positive signals (state codes, state names, "USA"/"US", the
/// US_PHRASES list) win over non-US signals, so "Remote - US or Canada"
/// passes. With no signal either way the answer is true: an empty or
/// ambiguous location must not reject a posting.
pub fn is_usa_location(location: &str) -> bool {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_lowercase();
    let tokens: Vec<&str> = trimmed
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for token in &tokens {
        if token.eq_ignore_ascii_case("usa") || *token == "US" {
            return true;
        }
        if STATE_ABBREVS.contains(token) {
            return true;
        }
    }
    if US_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    if STATE_NAMES.iter().any(|name| lower.contains(name)) {
        return true;
    }

    if NON_US_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return false;
    }
    let has_non_us_token = tokens
        .iter()
        .any(|token| NON_US_TOKENS.contains(&token.to_lowercase().as_str()));
    if has_non_us_token {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_units() {
        assert!(!is_stale("2 hours ago", 7));
        assert!(!is_stale("45 minutes ago", 7));
        assert!(!is_stale("30 seconds ago", 7));
        assert!(!is_stale("5 days ago", 7));
        assert!(!is_stale("7 days ago", 7));
        assert!(is_stale("9 days ago", 7));
        assert!(is_stale("3 weeks ago", 7));
        assert!(is_stale("1 week ago", 7));
        assert!(is_stale("2 months ago", 7));
        assert!(is_stale("1 year ago", 7));
    }

    #[test]
    fn test_stale_site_phrasings() {
        assert!(is_stale("Posted 30+ days ago", 7));
        assert!(!is_stale("Active 3 days ago", 7));
        assert!(!is_stale("Reposted 6 days ago", 7));
        assert!(!is_stale("yesterday", 7));
        assert!(is_stale("Yesterday", 0));
    }

    #[test]
    fn test_stale_badge_shorthand() {
        assert!(!is_stale("5d", 7));
        assert!(!is_stale("24h", 7));
        assert!(is_stale("9d", 7));
        assert!(is_stale("30d+", 7));
        assert!(is_stale("2w", 7));
    }

    #[test]
    fn test_stale_unparseable_is_fresh() {
        assert!(!is_stale("", 7));
        assert!(!is_stale("Just posted", 7));
        assert!(!is_stale("today", 7));
        assert!(!is_stale("New!", 7));
    }

    #[test]
    fn test_ignored_keyword_first_match_wins() {
        let keywords = vec!["clearance".to_string(), "senior".to_string()];
        assert_eq!(
            matches_ignored_keyword("Senior Engineer (TS clearance)", &keywords),
            Some("clearance")
        );
        assert_eq!(
            matches_ignored_keyword("Staff Engineer", &keywords),
            None
        );
    }

    #[test]
    fn test_ignored_keyword_case_insensitive() {
        let keywords = vec!["Senior".to_string()];
        assert!(matches_ignored_keyword("SENIOR backend dev", &keywords).is_some());
        assert!(matches_ignored_keyword("junior dev", &keywords).is_none());
    }

    #[test]
    fn test_ignored_domain() {
        let domains = vec!["indeed.com".to_string()];
        assert_eq!(
            matches_ignored_domain("https://www.indeed.com/job/123", &domains),
            Some("indeed.com")
        );
        assert_eq!(
            matches_ignored_domain("https://jobs.acme.com/123", &domains),
            None
        );
    }

    #[test]
    fn test_usa_positive() {
        assert!(is_usa_location("Austin, TX"));
        assert!(is_usa_location("Bloomington, IN"));
        assert!(is_usa_location("Remote (USA)"));
        assert!(is_usa_location("Remote - US or Canada"));
        assert!(is_usa_location("San Francisco, California"));
        assert!(is_usa_location("United States"));
    }

    #[test]
    fn test_usa_negative() {
        assert!(!is_usa_location("Toronto, Canada"));
        assert!(!is_usa_location("remote in Canada"));
        assert!(!is_usa_location("London, United Kingdom"));
        assert!(!is_usa_location("Bangalore"));
        assert!(!is_usa_location("Remote, EMEA"));
        assert!(!is_usa_location("Latin America"));
    }

    #[test]
    fn test_usa_default_true() {
        assert!(is_usa_location(""));
        assert!(is_usa_location("   "));
        assert!(is_usa_location("Remote"));
        assert!(is_usa_location("Anywhere"));
        // Milwaukee must not trip the "uk" token.
        assert!(is_usa_location("Milwaukee"));
    }
}
