/// Integration tests for URL parsing, serialization and containment
///
/// Serialized output is canonical: parsing it again gives the same tree.

use pretty_assertions::assert_eq;
use rhtmx_nav::url::{contains_tree, DefaultUrlSerializer, UrlSerializer, PRIMARY_OUTLET};
use rhtmx_nav::UrlParseError;
use rstest::rstest;

fn canonical(url: &str) -> String {
    let s = DefaultUrlSerializer;
    s.serialize(&s.parse(url).unwrap())
}

// ============================================================================
// Round trips
// ============================================================================

#[rstest]
#[case("/")]
#[case("/team/33")]
#[case("/team;id=33;open=yes/user/victor")]
#[case("/team/33/(user/victor//aux:chat)")]
#[case("/(aux:chat)")]
#[case("/inbox/33?debug=true&lang=en#top")]
#[case("/a%20b/c%2Fd")]
fn test_canonical_urls_round_trip(#[case] url: &str) {
    assert_eq!(canonical(url), url);
}

#[test]
fn test_serialized_form_is_stable() {
    let once = canonical("/team/33/(aux:chat//user/victor)");
    assert_eq!(canonical(&once), once);
}

#[test]
fn test_outlets_are_grouped_under_parent() {
    let tree = DefaultUrlSerializer.parse("/team/33/(user/victor//aux:chat)").unwrap();
    let team = tree.root.child(PRIMARY_OUTLET).unwrap();
    assert_eq!(team.segments.len(), 2);
    assert_eq!(team.number_of_children(), 2);
    assert_eq!(team.child("aux").unwrap().segments[0].path, "chat");
}

// ============================================================================
// Malformed input
// ============================================================================

#[rstest]
#[case("/team/(aux:chat")]
#[case("/team/33)")]
#[case("/;a=1")]
fn test_malformed_urls_are_rejected(#[case] url: &str) {
    let err: UrlParseError = DefaultUrlSerializer.parse(url).unwrap_err();
    assert!(!err.to_string().is_empty());
}

// ============================================================================
// Containment
// ============================================================================

#[rstest]
#[case("/team/33/user/victor", "/team/33", false, true)]
#[case("/team/33/user/victor", "/team/33", true, false)]
#[case("/team/33/user/victor", "/team/33/user/victor", true, true)]
#[case("/team/33?a=1&b=2", "/team/33?a=1", false, true)]
#[case("/team/33?a=1", "/team/33?a=2", false, false)]
#[case("/team/33", "/team/44", false, false)]
fn test_contains_tree(
    #[case] container: &str,
    #[case] containee: &str,
    #[case] exact: bool,
    #[case] expected: bool,
) {
    let s = DefaultUrlSerializer;
    let container = s.parse(container).unwrap();
    let containee = s.parse(containee).unwrap();
    assert_eq!(contains_tree(&container, &containee, exact), expected);
}
