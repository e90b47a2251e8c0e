//! Presentation heuristics for team-name text.
//!
//! These are pure string transforms kept out of the matching/merge logic:
//! they only affect how a team label reads, never which records match.

/// Longest label we still treat as a plausible abbreviation.
const ABBREV_MAX_LEN: usize = 5;

/// Drop the trailing mascot word from a multi-word team name
/// ("Ridgeview Wolves" → "Ridgeview").
///
/// False positives: a multi-word locality with no mascot ("Cedar Lake")
/// loses its last word. False negatives: single-word names are returned
/// unchanged even when they are pure mascot names.
pub fn strip_mascot(name: &str) -> String {
    let trimmed = name.trim();
    match trimmed.rsplit_once(char::is_whitespace) {
        Some((locality, _mascot)) => locality.trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Suggest replacing an abbreviated team label with the full display name.
///
/// Returns `Some(full)` only when `current` is short enough to plausibly be
/// an abbreviation and is not already a form of the full name. Heuristic,
/// not a guarantee: a genuinely short team name ("Ice") would be replaced
/// too (false positive), and abbreviations longer than the cutoff are left
/// alone (false negative).
pub fn expand_team_label(current: &str, full: &str) -> Option<String> {
    let current = current.trim();
    let full = full.trim();

    if current.is_empty() || full.is_empty() {
        return None;
    }
    if current.len() > ABBREV_MAX_LEN {
        return None;
    }
    if current.eq_ignore_ascii_case(full) || current.eq_ignore_ascii_case(&strip_mascot(full)) {
        return None;
    }

    Some(full.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_mascot_word() {
        assert_eq!(strip_mascot("Ridgeview Wolves"), "Ridgeview");
        assert_eq!(strip_mascot("  Brookfield Hawks  "), "Brookfield");
        assert_eq!(strip_mascot("Ridgeview"), "Ridgeview");
    }

    #[test]
    fn expands_short_abbreviations() {
        assert_eq!(
            expand_team_label("RW", "Ridgeview Wolves"),
            Some("Ridgeview Wolves".to_string())
        );
    }

    #[test]
    fn leaves_long_labels_alone() {
        assert_eq!(expand_team_label("Ridgeview Wolves", "Ridgeview Wolves"), None);
        assert_eq!(expand_team_label("Brookfield", "Brookfield Hawks"), None);
    }

    #[test]
    fn leaves_stripped_form_alone() {
        // "Ice" is already the mascot-stripped full name, not an abbreviation.
        assert_eq!(expand_team_label("Ice", "Ice Dogs"), None);
    }

    #[test]
    fn empty_inputs_never_expand() {
        assert_eq!(expand_team_label("", "Ridgeview Wolves"), None);
        assert_eq!(expand_team_label("RW", ""), None);
    }
}
