//! Constructors for entries from the specialised layers.
//!
//! Each fills `context` with what distinguishes its layer, so two entries for
//! the same term from different cultures or regions stay apart.

use serde_json::{Value, json};

use witness_types::{MeaningEntry, MeaningSource};

/// An etymology entry. `historical_usage` becomes the usage examples.
pub fn etymology<I, S>(term: impl Into<String>, origin: &str, historical_usage: I) -> MeaningEntry
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut entry = MeaningEntry::new(term, MeaningSource::Etymology, format!("Etymology: {origin}"))
        .with_examples(historical_usage);
    entry
        .context
        .insert("type".to_owned(), Value::from("historical_linguistic"));
    entry
}

/// A cultural-usage entry scoped to `cultures`.
pub fn cultural<I, S>(term: impl Into<String>, cultures: I, meaning: impl Into<String>) -> MeaningEntry
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scoped(term, MeaningSource::Cultural, "cultures", cultures, meaning)
}

/// A geographic entry scoped to `regions`.
pub fn geographic<I, S>(term: impl Into<String>, regions: I, meaning: impl Into<String>) -> MeaningEntry
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scoped(term, MeaningSource::Geographic, "regions", regions, meaning)
}

fn scoped<I, S>(
    term: impl Into<String>,
    source: MeaningSource,
    key: &str,
    scope: I,
    meaning: impl Into<String>,
) -> MeaningEntry
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let scope: Vec<String> = scope.into_iter().map(Into::into).collect();
    let mut entry = MeaningEntry::new(term, source, meaning);
    entry.context.insert(key.to_owned(), json!(scope));
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etymology_prefixes_the_origin() {
        let entry = etymology("letter", "Latin littera", ["a written character"]);
        assert_eq!(entry.source, MeaningSource::Etymology);
        assert_eq!(entry.definition, "Etymology: Latin littera");
        assert_eq!(entry.usage_examples, vec!["a written character".to_owned()]);
        assert_eq!(entry.context.get("type"), Some(&json!("historical_linguistic")));
    }

    #[test]
    fn scoped_layers_record_their_scope() {
        let entry = cultural("gift", ["coastal towns"], "an exchange marking a visit");
        assert_eq!(entry.context.get("cultures"), Some(&json!(["coastal towns"])));

        let entry = geographic("fell", ["north"], "a high stretch of moorland");
        assert_eq!(entry.source, MeaningSource::Geographic);
        assert_eq!(entry.context.get("regions"), Some(&json!(["north"])));
    }
}
