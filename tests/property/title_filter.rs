//! Property-based tests for the title shortlist

use draftsmith::generation::title::TitleFilter;
use proptest::prelude::*;

proptest! {
    #[test]
    fn shortlist_is_never_empty_for_non_empty_candidates(
        candidates in prop::collection::vec("[A-Za-z ]{1,30}", 1..6),
        keywords in prop::collection::vec("[a-z]{2,8}", 0..4),
    ) {
        let filter = TitleFilter::new(&["methodolog*", "apa"]);
        let shortlist = filter.shortlist(&candidates, &keywords);
        prop_assert!(!shortlist.is_empty());
        for title in &shortlist {
            prop_assert!(candidates.contains(title));
        }
    }

    #[test]
    fn selection_resolves_whenever_shortlist_has_entries(
        shortlist in prop::collection::vec("[A-Za-z ]{1,30}", 1..6),
        reply in "\\PC{0,40}",
    ) {
        let filter = TitleFilter::new(&["methodolog*", "apa"]);
        prop_assert!(filter.resolve_selection(&reply, &shortlist).is_some());
    }
}
