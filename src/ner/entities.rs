use tracing::debug;

use crate::core::error::{PipelineError, Result, Stage};
use crate::core::model::{Entities, EntityCategory};
use crate::ner::patterns::{find_matches, PATTERN_CATEGORIES};
use crate::ner::{EntityRecognizer, LabeledSpan};

/// Maps a model label onto its category; unknown labels map to nothing.
pub fn category_for_label(label: &str) -> Option<EntityCategory> {
    match label {
        "PERSON" => Some(EntityCategory::Persons),
        "ORG" => Some(EntityCategory::Organizations),
        "GPE" | "LOC" => Some(EntityCategory::Locations),
        "DATE" => Some(EntityCategory::Dates),
        "MONEY" => Some(EntityCategory::Amounts),
        _ => None,
    }
}

/// Merges model spans and pattern matches into deduplicated category sets.
///
/// Each category keeps the order in which values were first seen: model
/// spans in model order, pattern matches left to right.
pub struct EntityExtractor<'a> {
    recognizer: Option<&'a dyn EntityRecognizer>,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(recognizer: &'a dyn EntityRecognizer) -> Self {
        Self {
            recognizer: Some(recognizer),
        }
    }

    /// Extractor that only fills the pattern-fed categories.
    pub fn patterns_only() -> Self {
        Self { recognizer: None }
    }

    pub fn extract(&self, text: &str) -> Result<Entities> {
        let mut entities = Entities::default();

        if let Some(recognizer) = self.recognizer {
            let spans = recognizer
                .label(text)
                .map_err(|e| PipelineError::processing(Stage::Ner, e))?;
            route_spans(&mut entities, spans);
        }

        for category in PATTERN_CATEGORIES {
            let set = entities.get_mut(category);
            for found in find_matches(category, text) {
                set.insert(found);
            }
        }

        debug!(total = entities.total(), "entities extracted");
        Ok(entities)
    }
}

fn route_spans(entities: &mut Entities, spans: Vec<LabeledSpan>) {
    for span in spans {
        if let Some(category) = category_for_label(&span.label) {
            entities.insert(category, span.text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FixedRecognizer(Vec<LabeledSpan>);

    impl EntityRecognizer for FixedRecognizer {
        fn label(&self, _text: &str) -> anyhow::Result<Vec<LabeledSpan>> {
            Ok(self.0.clone())
        }
    }

    struct FailingRecognizer;

    impl EntityRecognizer for FailingRecognizer {
        fn label(&self, _text: &str) -> anyhow::Result<Vec<LabeledSpan>> {
            anyhow::bail!("model not loaded")
        }
    }

    #[test]
    fn routes_model_labels() {
        let recognizer = FixedRecognizer(vec![
            LabeledSpan::new("Ada Lovelace", "PERSON"),
            LabeledSpan::new("Acme Corp", "ORG"),
            LabeledSpan::new("London", "GPE"),
            LabeledSpan::new("the Alps", "LOC"),
            LabeledSpan::new("March 3, 2024", "DATE"),
            LabeledSpan::new("$1,200", "MONEY"),
            LabeledSpan::new("three", "CARDINAL"),
        ]);
        let entities = EntityExtractor::new(&recognizer).extract("").unwrap();

        assert_eq!(entities.persons.as_slice(), ["Ada Lovelace"]);
        assert_eq!(entities.organizations.as_slice(), ["Acme Corp"]);
        assert_eq!(entities.locations.as_slice(), ["London", "the Alps"]);
        assert_eq!(entities.dates.as_slice(), ["March 3, 2024"]);
        assert_eq!(entities.amounts.as_slice(), ["$1,200"]);
        assert_eq!(entities.total(), 6);
    }

    #[test]
    fn duplicate_email_is_collapsed() {
        let text = "contact billing@acme.com, cc billing@acme.com";
        let entities = EntityExtractor::patterns_only().extract(text).unwrap();
        assert_eq!(entities.emails.as_slice(), ["billing@acme.com"]);
    }

    #[test]
    fn duplicate_model_spans_are_collapsed_in_first_seen_order() {
        let recognizer = FixedRecognizer(vec![
            LabeledSpan::new("Bob", "PERSON"),
            LabeledSpan::new("Alice", "PERSON"),
            LabeledSpan::new("Bob", "PERSON"),
        ]);
        let entities = EntityExtractor::new(&recognizer).extract("").unwrap();
        assert_eq!(entities.persons.as_slice(), ["Bob", "Alice"]);
    }

    #[test]
    fn model_cannot_feed_pattern_categories() {
        let recognizer = FixedRecognizer(vec![LabeledSpan::new("a@b.io", "EMAIL")]);
        let entities = EntityExtractor::new(&recognizer).extract("").unwrap();
        assert!(entities.emails.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let recognizer = FixedRecognizer(vec![LabeledSpan::new("Acme Corp", "ORG")]);
        let extractor = EntityExtractor::new(&recognizer);
        let text = "Acme Corp, 555-123-4567, https://acme.io, sales@acme.io";
        assert_eq!(
            extractor.extract(text).unwrap(),
            extractor.extract(text).unwrap()
        );
    }

    #[test]
    fn recognizer_failure_is_processing_failure() {
        let err = EntityExtractor::new(&FailingRecognizer)
            .extract("text")
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ProcessingFailure {
                stage: Stage::Ner,
                ..
            }
        ));
    }

    #[test]
    fn empty_text_yields_empty_sets() {
        let entities = EntityExtractor::patterns_only().extract("").unwrap();
        assert_eq!(entities.total(), 0);
    }
}
