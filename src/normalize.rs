// 🔤 Identifier Normalizer
// One key shape for ids and display names: "CID_327 Athena Commando" == "cid327athenacommando"

/// Lower-case the input and drop every character outside `[a-z0-9]`.
///
/// Used identically for catalog ids, display names and raw tokens, so every
/// lookup that goes through it compares like with like.
pub fn normalize(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators_and_case() {
        assert_eq!(normalize("CID_327 Athena Commando"), "cid327athenacommando");
        assert_eq!(normalize("cid327athenacommando"), "cid327athenacommando");
        assert_eq!(normalize("AC/DC"), "acdc");
        assert_eq!(normalize("Trusty no.2"), "trustyno2");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  -_- "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "Glider_ID_013_PSBlue",
            "Électri-claw",
            "bid_027_carbideblue",
            "Rose team leader",
            "",
            "ÄÖÜ 123 ß",
        ];

        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_normalize_drops_non_ascii_letters() {
        // Lower-casing happens first, then anything outside [a-z0-9] goes
        assert_eq!(normalize("Électri-claw"), "lectriclaw");
    }
}
