/// Source of raw configuration values. `std::env::var` in production, a map
/// in tests.
pub(super) type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

#[must_use]
pub(super) fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[must_use]
pub(super) fn read_non_empty_env(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name)
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
pub(super) fn read_env_usize(
    lookup: Lookup<'_>,
    name: &str,
    default_value: usize,
    min_value: usize,
) -> usize {
    lookup(name)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}

#[must_use]
pub(super) fn read_env_f32(lookup: Lookup<'_>, name: &str) -> Option<f32> {
    lookup(name).and_then(|raw| raw.trim().parse::<f32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usize_reader_falls_back_below_minimum_or_on_garbage() {
        let lookup = |name: &str| match name {
            "LOW" => Some("0".to_string()),
            "BAD" => Some("three".to_string()),
            "OK" => Some(" 7 ".to_string()),
            _ => None,
        };
        assert_eq!(read_env_usize(&lookup, "LOW", 3, 1), 3);
        assert_eq!(read_env_usize(&lookup, "BAD", 3, 1), 3);
        assert_eq!(read_env_usize(&lookup, "OK", 3, 1), 7);
        assert_eq!(read_env_usize(&lookup, "MISSING", 3, 1), 3);
    }

    #[test]
    fn non_empty_reader_trims_and_drops_blank() {
        let lookup = |name: &str| (name == "BLANK").then(|| "   ".to_string());
        assert_eq!(read_non_empty_env(&lookup, "BLANK"), None);
    }
}
