use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::model::EntityCategory;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b")
        .unwrap_or_else(|e| panic!("Invalid email regex: {e}"))
});

/// North-American numbers: optional `+1`, optional parenthesised area code,
/// `-` or `.` separators.
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+?1[-.]?)?\(?\d{3}\)?[-.]?\d{3}[-.]?\d{4}\b")
        .unwrap_or_else(|e| panic!("Invalid phone regex: {e}"))
});

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"https?://(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)",
    )
    .unwrap_or_else(|e| panic!("Invalid URL regex: {e}"))
});

/// Categories fed by fixed patterns rather than by the model.
pub const PATTERN_CATEGORIES: [EntityCategory; 3] = [
    EntityCategory::Emails,
    EntityCategory::Phones,
    EntityCategory::Urls,
];

fn pattern_for(category: EntityCategory) -> Option<&'static Regex> {
    match category {
        EntityCategory::Emails => Some(&*EMAIL_REGEX),
        EntityCategory::Phones => Some(&*PHONE_REGEX),
        EntityCategory::Urls => Some(&*URL_REGEX),
        _ => None,
    }
}

/// All non-overlapping matches for a pattern category, left to right.
/// Model-fed categories yield nothing.
pub fn find_matches(category: EntityCategory, text: &str) -> impl Iterator<Item = &str> {
    pattern_for(category)
        .into_iter()
        .flat_map(move |re| re.find_iter(text).map(|m| m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn all(category: EntityCategory, text: &str) -> Vec<String> {
        find_matches(category, text).map(str::to_string).collect()
    }

    #[test]
    fn finds_emails() {
        assert_eq!(
            all(EntityCategory::Emails, "write to jane.doe@acme.com or ops@acme.co.uk today"),
            vec!["jane.doe@acme.com", "ops@acme.co.uk"]
        );
    }

    #[test]
    fn finds_phone_formats() {
        let text = "call 555-123-4567, (555) 123-4567 is wrong but 555.123.4567 and +1-555-123-4567 work";
        let found = all(EntityCategory::Phones, text);
        assert!(found.contains(&"555-123-4567".to_string()));
        assert!(found.contains(&"555.123.4567".to_string()));
        assert!(found.iter().any(|p| p.ends_with("555-123-4567") && p.starts_with('1')));
    }

    #[test]
    fn finds_urls() {
        assert_eq!(
            all(EntityCategory::Urls, "see https://www.example.com/docs?id=7 and http://acme.io."),
            vec!["https://www.example.com/docs?id=7", "http://acme.io."]
        );
    }

    #[test]
    fn model_categories_have_no_pattern() {
        assert!(all(EntityCategory::Persons, "jane.doe@acme.com").is_empty());
    }
}
