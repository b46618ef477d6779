//! Filter / FilterSet and the `matches` primitive (§3, C2).

use std::collections::HashMap;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// A single filter clause. Absent fields are unconstrained; present fields
/// are disjunctions within their value set, and the clause as a whole is
/// their conjunction (§3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub ids: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
    pub kinds: Option<Vec<u64>>,
    pub since: Option<u64>,
    pub until: Option<u64>,
    pub limit: Option<usize>,
    /// Keyed by the full tag field name including the `#`, e.g. `"#e"`.
    pub tags: Option<HashMap<String, Vec<String>>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every present field of this clause matches `event`.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| prefix_or_exact(id, &event.id)) {
                return false;
            }
        }
        if let Some(authors) = &self.authors {
            if !authors.iter().any(|a| prefix_or_exact(a, &event.pubkey)) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.created_at > until {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            for (field, values) in tags {
                let Some(letter) = field.strip_prefix('#').and_then(|s| s.chars().next()) else {
                    return false;
                };
                let present = crate::event::single_letter_tag_values(event, letter)
                    .any(|v| values.iter().any(|want| want == v));
                if !present {
                    return false;
                }
            }
        }
        true
    }
}

/// `value` matches `target` if it's an exact match, or — per common relay
/// convention for `ids`/`authors` — a hex prefix of it.
fn prefix_or_exact(value: &str, target: &str) -> bool {
    target.starts_with(value)
}

/// A non-empty, ordered sequence of filters sent with one subscription.
/// `matches(e, FS) = exists f in FS. matches(e, f)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet(pub Vec<Filter>);

impl FilterSet {
    pub fn matches(&self, event: &Event) -> bool {
        self.0.iter().any(|f| f.matches(event))
    }

    /// The maximum `limit` across member filters — but only if every member
    /// filter specifies one. A filter with no `limit` is itself unbounded,
    /// and since the set is a disjunction that clause's unbounded results
    /// must still come through, so the whole set is unbounded too.
    pub fn limit(&self) -> Option<usize> {
        if self.0.iter().any(|f| f.limit.is_none()) {
            return None;
        }
        self.0.iter().filter_map(|f| f.limit).max()
    }
}

// Filter's JSON shape mixes fixed fields with dynamic single-letter tag
// fields (`#e`, `#p`, ...), so it gets hand-written (de)serialization
// instead of `#[derive]`.
impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut len = 0;
        if self.ids.is_some() {
            len += 1;
        }
        if self.authors.is_some() {
            len += 1;
        }
        if self.kinds.is_some() {
            len += 1;
        }
        if self.since.is_some() {
            len += 1;
        }
        if self.until.is_some() {
            len += 1;
        }
        if self.limit.is_some() {
            len += 1;
        }
        len += self.tags.as_ref().map_or(0, |t| t.len());

        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(ids) = &self.ids {
            map.serialize_entry("ids", ids)?;
        }
        if let Some(authors) = &self.authors {
            map.serialize_entry("authors", authors)?;
        }
        if let Some(kinds) = &self.kinds {
            map.serialize_entry("kinds", kinds)?;
        }
        if let Some(since) = &self.since {
            map.serialize_entry("since", since)?;
        }
        if let Some(until) = &self.until {
            map.serialize_entry("until", until)?;
        }
        if let Some(limit) = &self.limit {
            map.serialize_entry("limit", limit)?;
        }
        if let Some(tags) = &self.tags {
            for (k, v) in tags {
                map.serialize_entry(k, v)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FilterVisitor;

        impl<'de> Visitor<'de> for FilterVisitor {
            type Value = Filter;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a nostr filter object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Filter, A::Error> {
                let mut filter = Filter::default();
                let mut tags: HashMap<String, Vec<String>> = HashMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "ids" => filter.ids = Some(map.next_value()?),
                        "authors" => filter.authors = Some(map.next_value()?),
                        "kinds" => filter.kinds = Some(map.next_value()?),
                        "since" => filter.since = Some(map.next_value()?),
                        "until" => filter.until = Some(map.next_value()?),
                        "limit" => filter.limit = Some(map.next_value()?),
                        other if other.starts_with('#') && other.chars().count() == 2 => {
                            tags.insert(other.to_string(), map.next_value()?);
                        }
                        _ => {
                            // Unknown field: consume and ignore, NIP-01
                            // relays are expected to be forward-compatible.
                            let _ = map.next_value::<de::IgnoredAny>()?;
                        }
                    }
                }

                if !tags.is_empty() {
                    filter.tags = Some(tags);
                }
                Ok(filter)
            }
        }

        deserializer.deserialize_map(FilterVisitor)
    }
}
