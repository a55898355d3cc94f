//! Player display-name canonicalization.
//!
//! Lineup and squad feeds spell the same player differently ("O. Giroud",
//! "o giroud", "Olivier Giroud"). Comparison always happens on the
//! normalized form produced here.

/// Normalize a player name for comparison:
/// - lowercase
/// - drop periods and every other character that is not a letter or whitespace
/// - collapse whitespace runs to a single space, trim the ends
///
/// Total and idempotent; an empty input yields an empty output.
pub fn normalize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_and_case_collapse_to_same_form() {
        assert_eq!(normalize_name("O. Giroud"), normalize_name("o giroud"));
        assert_eq!(normalize_name("O. Giroud"), "o giroud");
    }

    #[test]
    fn punctuation_and_digits_are_dropped() {
        assert_eq!(normalize_name("T. Alexander-Arnold"), "t alexanderarnold");
        assert_eq!(normalize_name("N'Golo Kanté (c)"), "ngolo kanté c");
        assert_eq!(normalize_name("Player 23"), "player");
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(normalize_name("  Bruno \t  Fernandes \n"), "bruno fernandes");
        // Removing a separator must not leave a double space behind.
        assert_eq!(normalize_name("Smith - Rowe"), "smith rowe");
    }

    #[test]
    fn empty_and_symbol_only_inputs() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name(" .-_ 99 "), "");
    }

    #[test]
    fn idempotent() {
        for raw in [
            "O. Giroud",
            "Smith - Rowe",
            "  Vinícius   Júnior ",
            "Ødegaard, M.",
            "ÉMILE SMITH ROWE",
            "",
        ] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "not idempotent for {raw:?}");
        }
    }
}
