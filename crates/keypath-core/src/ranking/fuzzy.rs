use crate::models::{Field, FieldSet, Record};
use crate::text::{similarity_ratio, tokenize};

/// The whole case-folded query plus each of its terms.
pub(super) fn variants(query: &str) -> Vec<String> {
    let whole = query.trim().to_lowercase();
    if whole.is_empty() {
        return Vec::new();
    }
    let mut out = vec![whole];
    for term in tokenize(query) {
        if !out.contains(&term) {
            out.push(term);
        }
    }
    out
}

/// Best similarity of any variant against the record's name, name tokens,
/// path labels and tags, with the fields that reached it.
pub(super) fn best_match(variants: &[String], record: &Record) -> (f32, FieldSet) {
    let name = record.name.to_lowercase();
    let name_tokens = tokenize(&record.name);
    let mut targets = vec![(Field::Name, name.as_str())];
    targets.extend(name_tokens.iter().map(|token| (Field::Name, token.as_str())));
    targets.extend(
        record
            .keyword_path
            .iter()
            .map(|label| (Field::Path, label.as_str())),
    );
    targets.extend(record.tags.iter().map(|tag| (Field::Tags, tag.as_str())));

    let mut best = 0.0f32;
    let mut fields = FieldSet::default();
    for variant in variants {
        for (field, target) in &targets {
            let ratio = similarity_ratio(variant, target);
            if ratio > best {
                best = ratio;
                fields = FieldSet::default();
                fields.insert(*field);
            } else if ratio > 0.0 && (ratio - best).abs() < f32::EPSILON {
                fields.insert(*field);
            }
        }
    }
    (best, fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_include_whole_query_and_terms() {
        assert_eq!(
            variants("Git Rebse"),
            vec!["git rebse".to_string(), "git".to_string(), "rebse".to_string()]
        );
        assert!(variants("   ").is_empty());
    }

    #[test]
    fn best_match_reports_every_field_at_the_top_ratio() {
        let record = Record::new("python_basics", "")
            .with_path(&["lang", "python"])
            .with_tags(&["python"]);
        let (ratio, fields) = best_match(&variants("pythn"), &record);
        assert!((ratio - 5.0 / 6.0).abs() < 1e-6);
        assert!(fields.contains(Field::Name));
        assert!(fields.contains(Field::Path));
        assert!(fields.contains(Field::Tags));
    }
}
