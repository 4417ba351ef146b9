//! Calico selector expressions.
//!
//! Selectors are built from label mappings as a conjunction of equality
//! terms. Terms are emitted in the mapping's iteration order, which is
//! unspecified: `&&` is commutative, so two selectors built from the same
//! mapping always select the same endpoints even when they differ byte for
//! byte.

use std::collections::HashMap;

/// Matches every endpoint.
pub const MATCH_ALL: &str = "all()";

/// The label Calico sets on every namespace profile with the namespace's name.
pub const NAMESPACE_NAME_LABEL: &str = "projectcalico.org/name";

const QUOTE: char = '\'';

pub type Map = HashMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("label key {0:?} must not contain a single quote")]
    QuotedKey(String),

    #[error("value {value:?} of label {key:?} must not contain a single quote")]
    QuotedValue { key: String, value: String },
}

/// Builds a selector matching endpoints that carry every label in `labels`.
///
/// An empty mapping selects all endpoints.
pub fn from_labels(labels: &Map) -> Result<String, Error> {
    let terms = labels
        .iter()
        .map(|(k, v)| equals(k, v))
        .collect::<Result<Vec<_>, _>>()?;

    if terms.is_empty() {
        return Ok(MATCH_ALL.to_string());
    }
    Ok(terms.join(" && "))
}

/// Builds a namespace selector matching exactly the namespace `ns`.
///
/// The namespace is embedded as an opaque label value.
pub fn namespace(ns: &str) -> Result<String, Error> {
    equals(NAMESPACE_NAME_LABEL, ns)
}

fn equals(key: &str, value: &str) -> Result<String, Error> {
    if key.contains(QUOTE) {
        return Err(Error::QuotedKey(key.to_string()));
    }
    if value.contains(QUOTE) {
        return Err(Error::QuotedValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(format!("{key} == '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use rstest::rstest;
    use std::collections::BTreeSet;

    fn terms(selector: &str) -> BTreeSet<&str> {
        selector.split(" && ").collect()
    }

    #[test]
    fn empty_matches_all() {
        assert_eq!(from_labels(&Map::new()).unwrap(), MATCH_ALL);
    }

    #[rstest]
    #[case("app", "test", "app == 'test'")]
    #[case("app.kubernetes.io/name", "web", "app.kubernetes.io/name == 'web'")]
    #[case("tier", "", "tier == ''")]
    fn single_label(#[case] key: &str, #[case] value: &str, #[case] expected: &str) {
        let labels = hashmap! { key.to_string() => value.to_string() };
        assert_eq!(from_labels(&labels).unwrap(), expected);
    }

    #[test]
    fn multiple_labels_in_any_order() {
        let labels = hashmap! {
            "a".to_string() => "1".to_string(),
            "b".to_string() => "2".to_string(),
        };
        let selector = from_labels(&labels).unwrap();
        assert!(
            selector == "a == '1' && b == '2'" || selector == "b == '2' && a == '1'",
            "unexpected selector: {selector}"
        );
    }

    #[test]
    fn every_label_becomes_one_term() {
        let labels = (0..16)
            .map(|i| (format!("k{i}"), format!("v{i}")))
            .collect::<Map>();
        let selector = from_labels(&labels).unwrap();
        let expected = labels
            .iter()
            .map(|(k, v)| format!("{k} == '{v}'"))
            .collect::<BTreeSet<_>>();
        assert_eq!(
            terms(&selector),
            expected.iter().map(String::as_str).collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn namespace_filter() {
        assert_eq!(
            namespace("team-b").unwrap(),
            "projectcalico.org/name == 'team-b'"
        );
    }

    #[test]
    fn rejects_quotes() {
        let labels = hashmap! { "app".to_string() => "x' || all() || '".to_string() };
        assert_eq!(
            from_labels(&labels),
            Err(Error::QuotedValue {
                key: "app".to_string(),
                value: "x' || all() || '".to_string(),
            })
        );

        let labels = hashmap! { "a'pp".to_string() => "web".to_string() };
        assert_eq!(
            from_labels(&labels),
            Err(Error::QuotedKey("a'pp".to_string()))
        );

        assert!(namespace("team-'b").is_err());
    }
}
