use crate::error::{KeypathError, Result};

pub const PATH_SEPARATOR: char = '/';

/// Canonical form of a taxonomy label or legacy tag.
///
/// Every entry point that accepts a label (adding records, migration,
/// rename, path filters) goes through this function, so two spellings that
/// normalize to the same string always address the same node.
pub fn normalize_label(raw: &str) -> Result<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let label = collapsed.to_lowercase();
    if label.is_empty() {
        return Err(KeypathError::Validation(format!(
            "keyword label is empty: {raw:?}"
        )));
    }
    if label.contains(PATH_SEPARATOR) {
        return Err(KeypathError::Validation(format!(
            "keyword label must not contain '{PATH_SEPARATOR}': {raw:?}"
        )));
    }
    if label.chars().any(char::is_control) {
        return Err(KeypathError::Validation(format!(
            "keyword label contains control characters: {raw:?}"
        )));
    }
    Ok(label)
}

pub fn normalize_path<S: AsRef<str>>(segments: &[S]) -> Result<Vec<String>> {
    segments
        .iter()
        .map(|segment| normalize_label(segment.as_ref()))
        .collect()
}

/// Parses `"lang/python"` style input into normalized segments.
pub fn parse_path(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim().trim_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed.split(PATH_SEPARATOR).map(normalize_label).collect()
}

/// Normalized, de-duplicated tag list in first-seen order. Tags that
/// normalize to nothing are dropped rather than rejected, since legacy tag
/// sets are not curated.
#[must_use]
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out = Vec::<String>::with_capacity(tags.len());
    for tag in tags {
        let Ok(tag) = normalize_label(tag.as_ref()) else {
            continue;
        };
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

pub fn validate_record_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KeypathError::Validation("record name is empty".to_string()));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(KeypathError::Validation(format!(
            "record name may only contain alphanumerics, '_' and '-': {name}"
        )));
    }
    Ok(())
}

#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|x| !x.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[must_use]
pub fn levenshtein(lhs: &str, rhs: &str) -> usize {
    if lhs == rhs {
        return 0;
    }
    let lhs_chars: Vec<char> = lhs.chars().collect();
    let rhs_chars: Vec<char> = rhs.chars().collect();
    if lhs_chars.is_empty() {
        return rhs_chars.len();
    }
    if rhs_chars.is_empty() {
        return lhs_chars.len();
    }

    let mut prev: Vec<usize> = (0..=rhs_chars.len()).collect();
    let mut curr = vec![0usize; rhs_chars.len() + 1];
    for (i, left) in lhs_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, right) in rhs_chars.iter().enumerate() {
            let substitution = prev[j] + usize::from(left != right);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[rhs_chars.len()]
}

/// `1 - distance / longest`, in `[0, 1]`.
#[must_use]
pub fn similarity_ratio(lhs: &str, rhs: &str) -> f32 {
    let longest = lhs.chars().count().max(rhs.chars().count());
    if longest == 0 {
        return 0.0;
    }
    let distance = levenshtein(lhs, rhs);
    (1.0 - usize_to_f32(distance) / usize_to_f32(longest)).clamp(0.0, 1.0)
}

#[allow(
    clippy::cast_precision_loss,
    reason = "similarity ratios are intentionally lossy floating-point values"
)]
pub(crate) const fn usize_to_f32(value: usize) -> f32 {
    value as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_label_folds_case_and_whitespace() {
        assert_eq!(
            normalize_label("  Version   Control ").expect("label"),
            "version control"
        );
    }

    #[test]
    fn normalize_label_rejects_separator_and_empty() {
        assert!(matches!(
            normalize_label("a/b"),
            Err(KeypathError::Validation(_))
        ));
        assert!(matches!(
            normalize_label("   "),
            Err(KeypathError::Validation(_))
        ));
    }

    #[test]
    fn parse_path_splits_and_normalizes() {
        assert_eq!(
            parse_path("/Lang/Python/").expect("path"),
            vec!["lang".to_string(), "python".to_string()]
        );
        assert!(parse_path("").expect("root").is_empty());
        assert!(parse_path("lang//go").is_err());
    }

    #[test]
    fn normalize_tags_dedups_after_folding() {
        let tags = normalize_tags(&["Git", "git", " ", "version-control"]);
        assert_eq!(tags, vec!["git".to_string(), "version-control".to_string()]);
    }

    #[test]
    fn record_names_follow_identifier_rule() {
        assert!(validate_record_name("python_basics-2").is_ok());
        assert!(validate_record_name("has space").is_err());
        assert!(validate_record_name("").is_err());
    }

    #[test]
    fn tokenize_strips_punctuation() {
        assert_eq!(
            tokenize("python_basics: Git, rebase!"),
            vec!["python", "basics", "git", "rebase"]
        );
    }

    #[test]
    fn levenshtein_counts_edits() {
        assert_eq!(levenshtein("pythn", "python"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn similarity_ratio_is_normalized() {
        let ratio = similarity_ratio("pythn", "python");
        assert!((ratio - (1.0 - 1.0 / 6.0)).abs() < 1e-6);
        assert!((similarity_ratio("same", "same") - 1.0).abs() < f32::EPSILON);
        assert!(similarity_ratio("", "").abs() < f32::EPSILON);
    }
}
