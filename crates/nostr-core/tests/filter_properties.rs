//! Property-based tests for `Filter` matching: empty-clause edge cases,
//! boundary timestamps, and prefix matching across randomly generated
//! kinds/timestamps/prefixes.

use std::collections::HashMap;

use nostr_core::{finalize_event, generate_secret_key, Event, EventTemplate, Filter};
use proptest::prelude::*;

fn make_event(kind: u64, tags: Vec<Vec<String>>, created_at: u64) -> Event {
    let sk = generate_secret_key();
    let template = EventTemplate {
        kind,
        tags,
        content: "x".to_string(),
        created_at,
    };
    finalize_event(&template, &sk).unwrap()
}

#[test]
fn prop_empty_ids_matches_nothing() {
    let event = make_event(1, vec![], 1_234_567_890);
    let mut filter = Filter::new();
    filter.ids = Some(vec![]);
    assert!(!filter.matches(&event));
}

#[test]
fn prop_empty_authors_matches_nothing() {
    let event = make_event(1, vec![], 1_234_567_890);
    let mut filter = Filter::new();
    filter.authors = Some(vec![]);
    assert!(!filter.matches(&event));
}

#[test]
fn prop_empty_tag_filter_no_match() {
    let event = make_event(1, vec![vec!["e".to_string(), "event123".to_string()]], 1_234_567_890);
    let mut filter = Filter::new();
    let mut tags = HashMap::new();
    tags.insert("#e".to_string(), vec![]);
    filter.tags = Some(tags);
    assert!(!filter.matches(&event));
}

#[test]
fn prop_missing_tag_no_match() {
    let event = make_event(1, vec![vec!["e".to_string(), "event123".to_string()]], 1_234_567_890);
    let mut filter = Filter::new();
    let mut tags = HashMap::new();
    tags.insert("#p".to_string(), vec!["pubkey456".to_string()]);
    filter.tags = Some(tags);
    assert!(!filter.matches(&event));
}

proptest! {
    #[test]
    fn prop_empty_kinds_matches_nothing(kind in 0u64..u16::MAX as u64) {
        let event = make_event(kind, vec![], 1_234_567_890);
        let mut filter = Filter::new();
        filter.kinds = Some(vec![]);
        prop_assert!(!filter.matches(&event));
    }

    #[test]
    fn prop_exact_kind_match(kind in 0u64..u16::MAX as u64) {
        let event = make_event(kind, vec![], 1_234_567_890);
        let mut filter = Filter::new();
        filter.kinds = Some(vec![kind]);
        prop_assert!(filter.matches(&event));
    }

    #[test]
    fn prop_different_kind_no_match(kind1 in 0u64..u16::MAX as u64, kind2 in 0u64..u16::MAX as u64) {
        prop_assume!(kind1 != kind2);
        let event = make_event(kind1, vec![], 1_234_567_890);
        let mut filter = Filter::new();
        filter.kinds = Some(vec![kind2]);
        prop_assert!(!filter.matches(&event));
    }

    #[test]
    fn prop_since_exact_match(timestamp in any::<u64>()) {
        let event = make_event(1, vec![], timestamp);
        let mut filter = Filter::new();
        filter.since = Some(timestamp);
        prop_assert!(filter.matches(&event));
    }

    #[test]
    fn prop_until_exact_match(timestamp in any::<u64>()) {
        let event = make_event(1, vec![], timestamp);
        let mut filter = Filter::new();
        filter.until = Some(timestamp);
        prop_assert!(filter.matches(&event));
    }

    #[test]
    fn prop_since_after_event_no_match(timestamp in 0u64..u64::MAX) {
        let event = make_event(1, vec![], timestamp);
        let mut filter = Filter::new();
        filter.since = Some(timestamp + 1);
        prop_assert!(!filter.matches(&event));
    }

    #[test]
    fn prop_until_before_event_no_match(timestamp in 1u64..u64::MAX) {
        let event = make_event(1, vec![], timestamp);
        let mut filter = Filter::new();
        filter.until = Some(timestamp - 1);
        prop_assert!(!filter.matches(&event));
    }

    #[test]
    fn prop_since_until_range(since in 1000u64..2000u64, until in 2000u64..3000u64) {
        let before = make_event(1, vec![], since - 1);
        let in_range = make_event(1, vec![], (since + until) / 2);
        let after = make_event(1, vec![], until + 1);

        let mut filter = Filter::new();
        filter.since = Some(since);
        filter.until = Some(until);

        prop_assert!(!filter.matches(&before));
        prop_assert!(filter.matches(&in_range));
        prop_assert!(!filter.matches(&after));
    }

    #[test]
    fn prop_partial_id_match(prefix_len in 1usize..=64usize) {
        let event = make_event(1, vec![], 1_234_567_890);
        let prefix = &event.id[..prefix_len];
        let mut filter = Filter::new();
        filter.ids = Some(vec![prefix.to_string()]);
        prop_assert!(filter.matches(&event));
    }

    #[test]
    fn prop_partial_author_match(prefix_len in 1usize..=64usize) {
        let event = make_event(1, vec![], 1_234_567_890);
        let prefix = &event.pubkey[..prefix_len];
        let mut filter = Filter::new();
        filter.authors = Some(vec![prefix.to_string()]);
        prop_assert!(filter.matches(&event));
    }

    #[test]
    fn prop_tag_value_exact_match_only(tag_len in 4usize..=32usize) {
        let full = "a".repeat(32);
        let value = full[..tag_len].to_string();
        let event = make_event(1, vec![vec!["e".to_string(), value.clone()]], 1_234_567_890);

        let mut filter = Filter::new();
        let mut tags = HashMap::new();
        tags.insert("#e".to_string(), vec![value]);
        filter.tags = Some(tags);

        prop_assert!(filter.matches(&event));
    }

    #[test]
    fn prop_all_conditions_and_logic(kind in 0u64..u16::MAX as u64, timestamp in 1000u64..2000u64) {
        let event = make_event(kind, vec![], timestamp);

        let mut matching = Filter::new();
        matching.kinds = Some(vec![kind]);
        matching.since = Some(timestamp - 100);
        matching.until = Some(timestamp + 100);
        prop_assert!(matching.matches(&event));

        let mut wrong_kind = Filter::new();
        wrong_kind.kinds = Some(vec![kind.wrapping_add(1)]);
        prop_assert!(!wrong_kind.matches(&event));

        let mut wrong_since = Filter::new();
        wrong_since.kinds = Some(vec![kind]);
        wrong_since.since = Some(timestamp + 100);
        prop_assert!(!wrong_since.matches(&event));
    }
}

#[test]
fn boundary_timestamp_zero_matches() {
    let event = make_event(1, vec![], 0);
    let mut filter = Filter::new();
    filter.since = Some(0);
    assert!(filter.matches(&event));
}

#[test]
fn boundary_timestamp_max_matches() {
    let event = make_event(1, vec![], u64::MAX);
    let mut filter = Filter::new();
    filter.until = Some(u64::MAX);
    assert!(filter.matches(&event));
}

#[test]
fn tag_with_no_value_does_not_match() {
    let event = make_event(1, vec![vec!["e".to_string()]], 1_234_567_890);
    let mut filter = Filter::new();
    let mut tags = HashMap::new();
    tags.insert("#e".to_string(), vec!["event123".to_string()]);
    filter.tags = Some(tags);
    assert!(!filter.matches(&event));
}
