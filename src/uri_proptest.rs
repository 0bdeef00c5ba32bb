//! Property-based tests for URI canonicalization and cache-key encoding.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::uri::{canonical_key, canonicalize, encode_cache_key, resolve_include};
    use proptest::prelude::*;
    use url::Url;

    // ============================================================================
    // encode_cache_key property tests
    // ============================================================================

    proptest! {
        /// Property: encode_cache_key never produces filesystem-unsafe characters
        #[test]
        fn encode_cache_key_never_produces_unsafe_chars(input in ".*") {
            let result = encode_cache_key(&input);
            let unsafe_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
            for ch in unsafe_chars {
                prop_assert!(
                    !result.contains(ch),
                    "encode_cache_key produced unsafe character '{}' from input '{}'",
                    ch,
                    input
                );
            }
        }

        /// Property: encode_cache_key is deterministic
        #[test]
        fn encode_cache_key_is_deterministic(input in ".*") {
            prop_assert_eq!(encode_cache_key(&input), encode_cache_key(&input));
        }

        /// Property: encode_cache_key preserves character count (1:1 replacement)
        #[test]
        fn encode_cache_key_preserves_char_count(input in ".+") {
            prop_assert_eq!(
                encode_cache_key(&input).chars().count(),
                input.chars().count()
            );
        }
    }

    // ============================================================================
    // canonicalize property tests
    // ============================================================================

    fn path_segments() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-zA-Z0-9_.-]{1,8}", 1..6).prop_map(|parts| parts.join("/"))
    }

    proptest! {
        /// Property: canonicalize is idempotent
        #[test]
        fn canonicalize_is_idempotent(path in path_segments()) {
            let url = Url::parse(&format!("https://example.com/{}", path)).unwrap();
            let once = canonicalize(&url);
            let twice = canonicalize(&once);
            prop_assert_eq!(once, twice);
        }

        /// Property: a canonical path contains no empty or dot segments
        #[test]
        fn canonicalize_removes_empty_and_dot_segments(path in path_segments()) {
            let noisy = format!("https://example.com/./{}//.", path.replace('/', "//"));
            let url = Url::parse(&noisy).unwrap();
            let canonical = canonicalize(&url);
            for segment in canonical.path_segments().unwrap() {
                prop_assert_ne!(segment, "");
                prop_assert_ne!(segment, ".");
            }
        }

        /// Property: `x`, `./x` and `.//x` resolved against one context share
        /// one canonical key
        #[test]
        fn canonical_key_identifies_relative_spellings(name in "[a-zA-Z0-9_-]{1,12}") {
            let context = Url::parse("file:///work/scripts/").unwrap();
            let target = format!("{}.kts", name);
            let plain = resolve_include(&context, &target).unwrap();
            let dotted = resolve_include(&context, &format!("./{}", target)).unwrap();
            let doubled = resolve_include(&context, &format!(".//{}", target)).unwrap();
            prop_assert_eq!(canonical_key(&plain), canonical_key(&dotted));
            prop_assert_eq!(canonical_key(&plain), canonical_key(&doubled));
        }
    }
}
