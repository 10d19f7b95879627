use serde::Deserialize;
use serde_json::Value;

use crate::issue::{codes, Issue};
use crate::item::{Item, ItemRecord};
use crate::wire::{lenient_string, null_as_default};

const CONTENT_SOURCE_NAME: &str = "Dropmark";

/// JSON decode target for one collection response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollectionPayload {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<ItemRecord>,
}

impl CollectionPayload {
    /// Decodes the whole body or fails.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Best-effort decode. Falls back to salvaging the name and every item
    /// that decodes on its own; what could not be used is reported as issues
    /// against `source`.
    pub fn from_json_lenient(source: &str, bytes: &[u8]) -> (Self, Vec<Issue>) {
        if let Ok(payload) = Self::from_json(bytes) {
            return (payload, Vec::new());
        }

        let value: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(err) => {
                let issue = Issue::error(
                    source,
                    codes::UNABLE_TO_DECODE_JSON_BODY,
                    format!("Unable to decode API response body as JSON: {err}"),
                );
                return (Self::default(), vec![issue]);
            }
        };
        let Value::Object(mut map) = value else {
            let issue = Issue::error(
                source,
                codes::UNABLE_TO_DECODE_JSON_BODY,
                "API response body is not a JSON object",
            );
            return (Self::default(), vec![issue]);
        };

        let mut issues = Vec::new();
        let name = match map.remove("name") {
            Some(value) => lenient_string(value).unwrap_or_else(|err| {
                issues.push(Issue::warning(
                    source,
                    codes::ITEM_SKIPPED_DURING_DECODE,
                    format!("Ignored API collection name: {err}"),
                ));
                String::new()
            }),
            None => String::new(),
        };
        let items = match map.remove("items") {
            Some(Value::Array(values)) => values
                .into_iter()
                .enumerate()
                .filter_map(|(pos, value)| match serde_json::from_value(value) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        issues.push(Issue::warning(
                            source,
                            codes::ITEM_SKIPPED_DURING_DECODE,
                            format!("Skipped API item at position {pos}: {err}"),
                        ));
                        None
                    }
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                issues.push(Issue::warning(
                    source,
                    codes::ITEM_SKIPPED_DURING_DECODE,
                    format!("API 'items' is not an array: {other}"),
                ));
                Vec::new()
            }
        };

        (Self { name, items }, issues)
    }
}

/// A fully finalized collection. Items are in payload order and item `i`
/// has index `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    source: String,
    name: String,
    items: Vec<Item>,
    issues: Vec<Issue>,
}

impl Collection {
    /// Assembles a collection from finalized items. Item issues are appended
    /// after the collection-level `issues`, in item order.
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        items: Vec<Item>,
        mut issues: Vec<Issue>,
    ) -> Self {
        for item in &items {
            issues.extend(item.issues().iter().cloned());
        }
        Self {
            source: source.into(),
            name: name.into(),
            items,
            issues,
        }
    }

    /// The API endpoint the collection was fetched from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_source_name(&self) -> &'static str {
        CONTENT_SOURCE_NAME
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// Items `start..=end`, or `None` when the range is out of bounds.
    pub fn items_between(&self, start: usize, end: usize) -> Option<&[Item]> {
        if start > end || end >= self.items.len() {
            return None;
        }
        Some(&self.items[start..=end])
    }

    /// Visits items in order. `handler` returns `false` to stop early;
    /// `after` receives the handled and total counts.
    pub fn for_each<B, H, A>(&self, before: B, mut handler: H, after: A)
    where
        B: FnOnce(usize),
        H: FnMut(usize, &Item, usize) -> bool,
        A: FnOnce(usize, usize),
    {
        let total = self.items.len();
        before(total);
        let mut handled = 0;
        for (index, item) in self.items.iter().enumerate() {
            if !handler(index, item, total) {
                break;
            }
            handled += 1;
        }
        after(handled, total);
    }

    /// Every issue: collection-level first, then item-level in item order.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> Vec<&Issue> {
        self.issues.iter().filter(|issue| issue.is_error()).collect()
    }

    pub fn warnings(&self) -> Vec<&Issue> {
        self.issues.iter().filter(|issue| issue.is_warning()).collect()
    }

    /// `(total, errors, warnings)`.
    pub fn issue_counts(&self) -> (usize, usize, usize) {
        let errors = self.issues.iter().filter(|issue| issue.is_error()).count();
        (self.issues.len(), errors, self.issues.len() - errors)
    }

    pub fn handle_issues<E, W>(&self, mut on_error: E, mut on_warning: W)
    where
        E: FnMut(&Issue),
        W: FnMut(&Issue),
    {
        for issue in &self.issues {
            if issue.is_error() {
                on_error(issue);
            } else {
                on_warning(issue);
            }
        }
    }
}
