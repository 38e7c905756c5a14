//! Property-based tests for text normalization and context capping

use draftsmith::generation::text::{cap_context, count_words, normalize_text, trailing_excerpt};
use proptest::prelude::*;

/// Text made of the characters normalization cares about.
fn messy_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("\r\n".to_string()),
            Just("\r".to_string()),
            Just("\n".to_string()),
            Just("  ".to_string()),
            Just("\t".to_string()),
            "[a-zA-Z0-9áéñ.,]{1,8}",
        ],
        0..40,
    )
    .prop_map(|pieces| pieces.concat())
}

proptest! {
    #[test]
    fn normalize_is_idempotent(input in messy_text()) {
        let once = normalize_text(&input);
        prop_assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn normalize_is_idempotent_on_arbitrary_strings(input in any::<String>()) {
        let once = normalize_text(&input);
        prop_assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn normalized_text_has_no_triple_newlines(input in messy_text()) {
        let out = normalize_text(&input);
        prop_assert!(!out.contains("\n\n\n"));
        prop_assert!(!out.contains('\r'));
        prop_assert_eq!(out.trim(), out.as_str());
    }

    #[test]
    fn normalize_keeps_word_count(input in messy_text()) {
        prop_assert_eq!(count_words(&normalize_text(&input)), count_words(&input));
    }

    #[test]
    fn capped_context_respects_budget(
        blocks in prop::collection::vec("[a-z ]{0,50}", 0..6),
        budget in 0usize..120,
    ) {
        let capped = cap_context(&blocks, budget);
        let marker = format!("\n\n[Context truncated to {} characters]", budget);
        match capped.strip_suffix(&marker) {
            Some(kept) => prop_assert_eq!(kept.chars().count(), budget),
            None => prop_assert!(capped.chars().count() <= budget),
        }
    }

    #[test]
    fn trailing_excerpt_is_a_suffix(text in "\\PC{0,60}", max in 0usize..80) {
        let excerpt = trailing_excerpt(&text, max);
        prop_assert!(text.ends_with(excerpt));
        prop_assert!(excerpt.chars().count() <= max);
    }
}
