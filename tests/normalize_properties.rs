use langfilter::normalize;
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalize_is_idempotent(s in ".{0,200}") {
        let once = normalize(&s);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn output_has_no_ascii_punctuation(s in ".{0,200}") {
        let out = normalize(&s);
        prop_assert!(out.chars().all(|c| !c.is_ascii_punctuation() || c == '_'));
    }

    #[test]
    fn output_has_no_edge_or_double_spaces(s in "[ a-zA-Z.,!\t\n]{0,100}") {
        let out = normalize(&s);
        prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
        prop_assert!(!out.contains("  "));
    }

    #[test]
    fn extended_characters_survive(s in "[\u{0400}-\u{04FF}\u{4E00}-\u{4E50}]{1,40}") {
        let out = normalize(&s);
        prop_assert_eq!(out, s.to_lowercase());
    }
}
