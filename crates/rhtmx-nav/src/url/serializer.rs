//! String ⇄ UrlTree conversion
//!
//! Grammar understood by [`DefaultUrlSerializer`]:
//!
//! ```text
//! /team/33;mode=edit/(user/victor//aux:chat)?debug=1#top
//!  ^^^^ ^^ ^^^^^^^^^  ^^^^^^^^^^^ ^^^^^^^^^ ^^^^^^^^ ^^^
//!  path    matrix     primary     named      query   fragment
//!                     outlet      outlet
//! ```
//!
//! `(...)` opens an outlet group, `//` separates sibling outlets and
//! `name:` prefixes a named outlet.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::UrlParseError;

use super::{Params, UrlSegment, UrlSegmentGroup, UrlTree, PRIMARY_OUTLET};

/// Converts between raw URL strings and [`UrlTree`]s
pub trait UrlSerializer: Send + Sync {
    fn parse(&self, url: &str) -> Result<UrlTree, UrlParseError>;

    fn serialize(&self, tree: &UrlTree) -> String;
}

/// The standard outlet-aware URL format
///
/// # Examples
///
/// ```
/// use rhtmx_nav::url::{DefaultUrlSerializer, UrlSerializer};
///
/// let s = DefaultUrlSerializer;
/// let tree = s.parse("/team/33/(user/victor//aux:chat)?debug=1#top").unwrap();
/// assert_eq!(s.serialize(&tree), "/team/33/(user/victor//aux:chat)?debug=1#top");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultUrlSerializer;

impl UrlSerializer for DefaultUrlSerializer {
    fn parse(&self, url: &str) -> Result<UrlTree, UrlParseError> {
        let mut parser = UrlParser::new(url);
        let root = parser.parse_root_segment()?;
        let query_params = parser.parse_query_params()?;
        let fragment = parser.parse_fragment()?;
        Ok(UrlTree::new(root, query_params, fragment))
    }

    fn serialize(&self, tree: &UrlTree) -> String {
        let segment = serialize_group(&tree.root, true);
        let query = serialize_query_params(&tree.query_params);
        let fragment = tree
            .fragment
            .as_ref()
            .map(|f| format!("#{}", encode(f)))
            .unwrap_or_default();
        format!("/{}{}{}", segment, query, fragment)
    }
}

// ============================================================================
// Serialization
// ============================================================================

fn encode(s: &str) -> Cow<'_, str> {
    urlencoding::encode(s)
}

fn decode(s: &str) -> Result<String, UrlParseError> {
    urlencoding::decode(s)
        .map(Cow::into_owned)
        .map_err(|_| UrlParseError::Decode {
            input: s.to_string(),
        })
}

pub(crate) fn serialize_path(segment: &UrlSegment) -> String {
    let params: String = segment
        .parameters
        .iter()
        .map(|(k, v)| format!(";{}={}", encode(k), encode(v)))
        .collect();
    format!("{}{}", encode(&segment.path), params)
}

pub(crate) fn serialize_paths(segments: &[UrlSegment]) -> String {
    segments
        .iter()
        .map(serialize_path)
        .collect::<Vec<_>>()
        .join("/")
}

fn serialize_group(group: &UrlSegmentGroup, root: bool) -> String {
    if !group.has_children() {
        return serialize_paths(&group.segments);
    }

    if root {
        let primary = group
            .child(PRIMARY_OUTLET)
            .map(|c| serialize_group(c, false))
            .unwrap_or_default();
        let named: Vec<String> = group
            .children
            .iter()
            .filter(|(outlet, _)| outlet.as_str() != PRIMARY_OUTLET)
            .map(|(outlet, child)| format!("{}:{}", outlet, serialize_group(child, false)))
            .collect();

        if named.is_empty() {
            primary
        } else {
            format!("{}({})", primary, named.join("//"))
        }
    } else {
        let children: Vec<String> = group
            .children_primary_first()
            .into_iter()
            .map(|(outlet, child)| {
                if outlet == PRIMARY_OUTLET {
                    serialize_group(child, false)
                } else {
                    format!("{}:{}", outlet, serialize_group(child, false))
                }
            })
            .collect();

        let paths = serialize_paths(&group.segments);
        if group.number_of_children() == 1 && group.child(PRIMARY_OUTLET).is_some() {
            format!("{}/{}", paths, children[0])
        } else {
            format!("{}/({})", paths, children.join("//"))
        }
    }
}

fn serialize_query_params(params: &Params) -> String {
    if params.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect();
    format!("?{}", pairs.join("&"))
}

// ============================================================================
// Parsing
// ============================================================================

/// Longest prefix made of characters not in `stop`
fn match_prefix<'a>(s: &'a str, stop: &[char]) -> &'a str {
    let end = s.find(|c: char| stop.contains(&c)).unwrap_or(s.len());
    &s[..end]
}

const SEGMENT_STOP: &[char] = &['/', '(', ')', '?', ';', '=', '#'];
const QUERY_KEY_STOP: &[char] = &['=', '?', '&', '#'];
const QUERY_VALUE_STOP: &[char] = &['?', '&', '#'];

fn match_segment(s: &str) -> &str {
    match_prefix(s, SEGMENT_STOP)
}

struct UrlParser<'a> {
    url: &'a str,
    remaining: &'a str,
}

impl<'a> UrlParser<'a> {
    fn new(url: &'a str) -> Self {
        Self {
            url,
            remaining: url,
        }
    }

    fn peek_starts_with(&self, prefix: &str) -> bool {
        self.remaining.starts_with(prefix)
    }

    fn consume_optional(&mut self, prefix: &str) -> bool {
        match self.remaining.strip_prefix(prefix) {
            Some(rest) => {
                self.remaining = rest;
                true
            }
            None => false,
        }
    }

    fn capture(&mut self, expected: &str) -> Result<(), UrlParseError> {
        if self.consume_optional(expected) {
            Ok(())
        } else {
            Err(UrlParseError::Expected {
                expected: expected.to_string(),
                remaining: self.remaining.to_string(),
            })
        }
    }

    fn parse_root_segment(&mut self) -> Result<UrlSegmentGroup, UrlParseError> {
        self.consume_optional("/");

        if self.remaining.is_empty() || self.peek_starts_with("?") || self.peek_starts_with("#") {
            return Ok(UrlSegmentGroup::empty());
        }

        Ok(UrlSegmentGroup::new(Vec::new(), self.parse_children()?))
    }

    fn parse_children(&mut self) -> Result<BTreeMap<String, Arc<UrlSegmentGroup>>, UrlParseError> {
        if self.remaining.is_empty() {
            return Ok(BTreeMap::new());
        }

        self.consume_optional("/");

        let mut segments = Vec::new();
        if !self.peek_starts_with("(") {
            segments.push(self.parse_segment()?);
        }

        while self.peek_starts_with("/") && !self.peek_starts_with("//") && !self.peek_starts_with("/(")
        {
            self.capture("/")?;
            segments.push(self.parse_segment()?);
        }

        let mut children = BTreeMap::new();
        if self.peek_starts_with("/(") {
            self.capture("/")?;
            children = self.parse_parens(true)?;
        }

        let mut result = BTreeMap::new();
        if self.peek_starts_with("(") {
            result = self.parse_parens(false)?;
        }

        if !segments.is_empty() || !children.is_empty() {
            result.insert(
                PRIMARY_OUTLET.to_string(),
                Arc::new(UrlSegmentGroup::new(segments, children)),
            );
        }

        Ok(result)
    }

    fn parse_segment(&mut self) -> Result<UrlSegment, UrlParseError> {
        let path = match_segment(self.remaining);
        if path.is_empty() && self.peek_starts_with(";") {
            return Err(UrlParseError::EmptySegmentParams {
                remaining: self.remaining.to_string(),
            });
        }
        self.capture(path)?;
        let path = decode(path)?;
        Ok(UrlSegment::new(path, self.parse_matrix_params()?))
    }

    fn parse_matrix_params(&mut self) -> Result<Params, UrlParseError> {
        let mut params = Params::new();
        while self.consume_optional(";") {
            self.parse_param(&mut params)?;
        }
        Ok(params)
    }

    fn parse_param(&mut self, params: &mut Params) -> Result<(), UrlParseError> {
        let key = match_segment(self.remaining);
        if key.is_empty() {
            return Ok(());
        }
        self.capture(key)?;

        let mut value = "";
        if self.consume_optional("=") {
            let matched = match_segment(self.remaining);
            if !matched.is_empty() {
                value = matched;
                self.capture(value)?;
            }
        }

        params.insert(decode(key)?, decode(value)?);
        Ok(())
    }

    fn parse_query_params(&mut self) -> Result<Params, UrlParseError> {
        let mut params = Params::new();
        if self.consume_optional("?") {
            loop {
                self.parse_query_param(&mut params)?;
                if !self.consume_optional("&") {
                    break;
                }
            }
        }
        Ok(params)
    }

    fn parse_query_param(&mut self, params: &mut Params) -> Result<(), UrlParseError> {
        let key = match_prefix(self.remaining, QUERY_KEY_STOP);
        if key.is_empty() {
            return Ok(());
        }
        self.capture(key)?;

        let mut value = "";
        if self.consume_optional("=") {
            let matched = match_prefix(self.remaining, QUERY_VALUE_STOP);
            if !matched.is_empty() {
                value = matched;
                self.capture(value)?;
            }
        }

        params.insert(decode(key)?, decode(value)?);
        Ok(())
    }

    fn parse_fragment(&mut self) -> Result<Option<String>, UrlParseError> {
        if self.consume_optional("#") {
            let fragment = decode(self.remaining)?;
            self.remaining = "";
            Ok(Some(fragment))
        } else if self.remaining.is_empty() {
            Ok(None)
        } else {
            Err(UrlParseError::UnexpectedToken {
                url: self.url.to_string(),
            })
        }
    }

    fn parse_parens(
        &mut self,
        allow_primary: bool,
    ) -> Result<BTreeMap<String, Arc<UrlSegmentGroup>>, UrlParseError> {
        let mut groups = BTreeMap::new();
        self.capture("(")?;

        while !self.consume_optional(")") {
            if self.remaining.is_empty() {
                return Err(UrlParseError::Expected {
                    expected: ")".to_string(),
                    remaining: String::new(),
                });
            }
            let before = self.remaining.len();
            let path = match_segment(self.remaining);
            let next = self.remaining[path.len()..].chars().next();
            if !matches!(next, Some('/') | Some(')') | Some(';')) {
                return Err(UrlParseError::UnexpectedToken {
                    url: self.url.to_string(),
                });
            }

            let outlet = match path.find(':') {
                Some(idx) => {
                    let name = &path[..idx];
                    self.capture(name)?;
                    self.capture(":")?;
                    name.to_string()
                }
                None if allow_primary => PRIMARY_OUTLET.to_string(),
                None => {
                    return Err(UrlParseError::UnexpectedToken {
                        url: self.url.to_string(),
                    })
                }
            };

            let mut children = self.parse_children()?;
            let group = if children.len() == 1 && children.contains_key(PRIMARY_OUTLET) {
                children.remove(PRIMARY_OUTLET).unwrap_or_default()
            } else {
                Arc::new(UrlSegmentGroup::new(Vec::new(), children))
            };
            groups.insert(outlet, group);

            self.consume_optional("//");

            if self.remaining.len() == before {
                return Err(UrlParseError::UnexpectedToken {
                    url: self.url.to_string(),
                });
            }
        }

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(url: &str) -> UrlTree {
        DefaultUrlSerializer.parse(url).unwrap()
    }

    fn round_trip(url: &str) -> String {
        DefaultUrlSerializer.serialize(&parse(url))
    }

    #[test]
    fn test_parse_root() {
        assert_eq!(parse("/"), UrlTree::empty());
        assert_eq!(parse(""), UrlTree::empty());
        assert_eq!(round_trip("/"), "/");
    }

    #[test]
    fn test_parse_single_segment() {
        let tree = parse("/one");
        let primary = tree.root.child(PRIMARY_OUTLET).unwrap();
        assert_eq!(primary.segments, vec![UrlSegment::from_path("one")]);
        assert!(!primary.has_children());
    }

    #[test]
    fn test_parse_multiple_segments() {
        let tree = parse("/one/two");
        let primary = tree.root.child(PRIMARY_OUTLET).unwrap();
        let paths: Vec<&str> = primary.segments.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["one", "two"]);
        assert_eq!(round_trip("/one/two"), "/one/two");
    }

    #[test]
    fn test_parse_secondary_at_root() {
        let tree = parse("/one(left:two//right:three)");
        assert_eq!(tree.root.number_of_children(), 3);
        assert_eq!(tree.root.child("left").unwrap().segments[0].path, "two");
        assert_eq!(tree.root.child("right").unwrap().segments[0].path, "three");
        assert_eq!(round_trip("/one(left:two//right:three)"), "/one(left:two//right:three)");
    }

    #[test]
    fn test_parse_nested_outlets() {
        let tree = parse("/one/(two//left:three)");
        let one = tree.root.child(PRIMARY_OUTLET).unwrap();
        assert_eq!(one.segments[0].path, "one");
        assert_eq!(one.child(PRIMARY_OUTLET).unwrap().segments[0].path, "two");
        assert_eq!(one.child("left").unwrap().segments[0].path, "three");
        assert_eq!(round_trip("/one/(two//left:three)"), "/one/(two//left:three)");
    }

    #[test]
    fn test_parse_only_named_outlets() {
        assert_eq!(round_trip("/(left:one//right:two)"), "/(left:one//right:two)");
        let tree = parse("/(left:one)");
        assert!(tree.root.child(PRIMARY_OUTLET).is_none());
    }

    #[test]
    fn test_parse_outlet_with_multiple_segments() {
        let tree = parse("/one/(two/three//left:four)");
        let one = tree.root.child(PRIMARY_OUTLET).unwrap();
        assert_eq!(one.child(PRIMARY_OUTLET).unwrap().segments.len(), 2);
        assert_eq!(round_trip("/one/(two/three//left:four)"), "/one/(two/three//left:four)");
    }

    #[test]
    fn test_matrix_params() {
        let tree = parse("/one;a=11;b=22/two;c=33");
        let primary = tree.root.child(PRIMARY_OUTLET).unwrap();
        assert_eq!(primary.segments[0].parameters.get("a"), Some(&"11".to_string()));
        assert_eq!(primary.segments[0].parameters.get("b"), Some(&"22".to_string()));
        assert_eq!(primary.segments[1].parameters.get("c"), Some(&"33".to_string()));
        assert_eq!(round_trip("/one;a=11;b=22/two;c=33"), "/one;a=11;b=22/two;c=33");
    }

    #[test]
    fn test_matrix_param_without_value() {
        let tree = parse("/one;a");
        let primary = tree.root.child(PRIMARY_OUTLET).unwrap();
        assert_eq!(primary.segments[0].parameters.get("a"), Some(&String::new()));
    }

    #[test]
    fn test_query_params_and_fragment() {
        let tree = parse("/one?a=1&b=2#frag");
        assert_eq!(tree.query_params.get("a"), Some(&"1".to_string()));
        assert_eq!(tree.query_params.get("b"), Some(&"2".to_string()));
        assert_eq!(tree.fragment.as_deref(), Some("frag"));
        assert_eq!(round_trip("/one?a=1&b=2#frag"), "/one?a=1&b=2#frag");
    }

    #[test]
    fn test_query_without_path() {
        let tree = parse("/?a=1");
        assert_eq!(tree.root.number_of_children(), 0);
        assert_eq!(round_trip("/?a=1"), "/?a=1");
    }

    #[test]
    fn test_empty_fragment() {
        assert_eq!(parse("/one#").fragment.as_deref(), Some(""));
        assert_eq!(parse("/one").fragment, None);
    }

    #[test]
    fn test_encoding() {
        let tree = parse("/one%20two;k%3D=v%3B?q%26=%3F#f%20g");
        let primary = tree.root.child(PRIMARY_OUTLET).unwrap();
        assert_eq!(primary.segments[0].path, "one two");
        assert_eq!(primary.segments[0].parameters.get("k="), Some(&"v;".to_string()));
        assert_eq!(tree.query_params.get("q&"), Some(&"?".to_string()));
        assert_eq!(tree.fragment.as_deref(), Some("f g"));
        assert_eq!(
            DefaultUrlSerializer.serialize(&tree),
            "/one%20two;k%3D=v%3B?q%26=%3F#f%20g"
        );
    }

    #[test]
    fn test_empty_segment_with_params_fails() {
        let err = DefaultUrlSerializer.parse("/one/;a=1").unwrap_err();
        assert!(matches!(err, UrlParseError::EmptySegmentParams { .. }));
    }

    #[test]
    fn test_unbalanced_group_fails() {
        assert!(DefaultUrlSerializer.parse("/one/(two").is_err());
        assert!(DefaultUrlSerializer.parse("/one(two)").is_err());
    }

    #[test]
    fn test_invalid_encoding_fails() {
        let err = DefaultUrlSerializer.parse("/%FF").unwrap_err();
        assert!(matches!(err, UrlParseError::Decode { .. }));
    }
}
