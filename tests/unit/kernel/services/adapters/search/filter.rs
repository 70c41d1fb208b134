use super::*;

#[test]
fn test_literal_case_sensitive() {
    let filter = LineFilter::literal("ERROR", true);
    assert!(filter.is_match("2024-01-01 ERROR disk full"));
    assert!(!filter.is_match("2024-01-01 error disk full"));
}

#[test]
fn test_literal_case_insensitive() {
    let filter = LineFilter::literal("Error", false);
    assert!(filter.is_match("ERROR"));
    assert!(filter.is_match("an error occurred"));
    assert!(!filter.is_match("warning"));
}

#[test]
fn test_empty_literal_matches_everything() {
    let filter = LineFilter::literal("", true);
    assert!(filter.is_match(""));
    assert!(filter.is_match("anything"));
}

#[test]
fn test_regex_filter() {
    let filter = LineFilter::regex(r"^\d{3} ", true).unwrap();
    assert!(filter.is_regex());
    assert!(filter.is_match("500 internal"));
    assert!(!filter.is_match("GET /index 200"));
}

#[test]
fn test_invalid_regex() {
    let err = LineFilter::regex("(unclosed", true).unwrap_err();
    assert!(err.to_string().starts_with("Invalid regex"));
}

#[test]
fn test_closure_predicate() {
    let predicate = |line: &str| line.len() > 3;
    let predicate: &dyn LinePredicate = &predicate;
    assert!(predicate.is_match("long line"));
    assert!(!predicate.is_match("no"));
}

#[test]
fn test_clone_keeps_needle() {
    let filter = LineFilter::literal("needle", true);
    let cloned = filter.clone();
    assert!(cloned.is_match("haystack needle haystack"));
    assert!(format!("{:?}", cloned).contains("needle"));
}
