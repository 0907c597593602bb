use thiserror::Error;
use uuid::Uuid;

use crate::database::models::Label;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Title must be at most {max} characters")]
    TitleTooLong { max: usize },

    #[error("A label with this title already exists")]
    DuplicateTitle,
}

/// Collapse every whitespace run (spaces, tabs, newlines) to a single space
/// and trim the edges.
pub fn normalize_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate a candidate title against the scoping owner's existing labels.
///
/// `existing` must already be scoped to the right owner: the acting identity
/// for a create, the edited label's original owner for an update. For updates
/// `exclude` carries the edited label's id so it never conflicts with itself.
///
/// Pure function of its arguments; returns the normalized title on success.
pub fn validate_title(
    raw: &str,
    existing: &[Label],
    exclude: Option<Uuid>,
    max_length: usize,
) -> Result<String, ValidationError> {
    let title = normalize_title(raw);

    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > max_length {
        return Err(ValidationError::TitleTooLong { max: max_length });
    }

    let lowered = title.to_lowercase();
    let duplicate = existing
        .iter()
        .filter(|label| exclude != Some(label.id))
        .any(|label| label.title.to_lowercase() == lowered);

    if duplicate {
        return Err(ValidationError::DuplicateTitle);
    }

    Ok(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn label(owner: Uuid, title: &str) -> Label {
        Label {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: title.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(
            normalize_title("  test    label  spaces   "),
            "test label spaces"
        );
        assert_eq!(normalize_title("a\tb\nc"), "a b c");
        assert_eq!(normalize_title("plain"), "plain");
    }

    #[test]
    fn rejects_titles_that_normalize_to_empty() {
        for raw in [" ", "\t \n", ""] {
            assert_eq!(
                validate_title(raw, &[], None, 64),
                Err(ValidationError::EmptyTitle),
                "raw: {:?}",
                raw
            );
        }
    }

    #[test]
    fn rejects_over_long_titles() {
        let raw = "x".repeat(65);
        assert_eq!(
            validate_title(&raw, &[], None, 64),
            Err(ValidationError::TitleTooLong { max: 64 })
        );
        // Length is measured after normalization
        let padded = format!("  {}  ", "x".repeat(64));
        assert_eq!(validate_title(&padded, &[], None, 64).unwrap(), "x".repeat(64));
    }

    #[test]
    fn rejects_case_insensitive_duplicates() {
        let owner = Uuid::new_v4();
        let existing = vec![label(owner, "test label")];

        assert_eq!(
            validate_title("TEST LABEL", &existing, None, 64),
            Err(ValidationError::DuplicateTitle)
        );
        assert_eq!(
            validate_title("  Test   Label ", &existing, None, 64),
            Err(ValidationError::DuplicateTitle)
        );
        assert_eq!(
            validate_title("other", &existing, None, 64).unwrap(),
            "other"
        );
    }

    #[test]
    fn excluded_label_never_conflicts_with_itself() {
        let owner = Uuid::new_v4();
        let edited = label(owner, "test label");
        let existing = vec![edited.clone(), label(owner, "second")];

        // Re-saving the same title (even recased/respaced) succeeds
        assert_eq!(
            validate_title("TEST  LABEL", &existing, Some(edited.id), 64).unwrap(),
            "TEST LABEL"
        );
        // But colliding with a sibling still fails
        assert_eq!(
            validate_title("Second", &existing, Some(edited.id), 64),
            Err(ValidationError::DuplicateTitle)
        );
    }
}
