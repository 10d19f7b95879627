use std::future::Future;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use url::Url;

use crate::frontmatter::{FrontMatter, FrontMatterParser};
use crate::issue::{codes, Issue};
use crate::traversal::{LinkTraversal, ResolvedLink, TraversalError};
use crate::wire::{lenient_bool, lenient_i64, lenient_string, null_as_default};

/// The only item classification whose link is followed.
pub const LINK_ITEM_TYPE: &str = "link";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A group of image URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Thumbnails {
    #[serde(deserialize_with = "lenient_string")]
    pub mini: String,
    #[serde(deserialize_with = "lenient_string")]
    pub small: String,
    #[serde(deserialize_with = "lenient_string")]
    pub large: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cropped: String,
    #[serde(deserialize_with = "lenient_string")]
    pub uncropped: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Tag {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
}

/// A bookmark exactly as decoded from the API, before any tidying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ItemRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_url: bool,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_string")]
    pub mime: String,
    #[serde(deserialize_with = "lenient_string")]
    pub link: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub updated_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub deleted_at: String,
    #[serde(rename = "thumbnail", deserialize_with = "lenient_string")]
    pub thumbnail_url: String,
    pub thumbnails: Option<Thumbnails>,
    #[serde(deserialize_with = "lenient_string")]
    pub user_id: String,
    #[serde(rename = "username", deserialize_with = "lenient_string")]
    pub user_name_short: String,
    #[serde(rename = "user_name", deserialize_with = "lenient_string")]
    pub user_name_long: String,
    #[serde(deserialize_with = "lenient_string")]
    pub user_email: String,
    pub user_avatar: Option<Thumbnails>,
    #[serde(rename = "url", deserialize_with = "lenient_string")]
    pub edit_url: String,
}

/// Receives a human-readable note for every tidy edit applied to an item.
pub trait TidySink: Send + Sync {
    fn on_tidy(&self, edit: &str);
}

impl<F> TidySink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_tidy(&self, edit: &str) {
        self(edit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SentenceError {
    #[error("unable to find any sentences in the body")]
    NoSentences,
    #[error("{0}")]
    Other(String),
}

/// Natural-language sentence splitter.
pub trait FirstSentence: Send + Sync {
    fn first_sentence(&self, text: &str) -> Result<String, SentenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp {value:?}: {reason}")]
pub struct TimestampError {
    pub value: String,
    pub reason: String,
}

/// Parses `"YYYY-MM-DD HH:MM:SS ZONE"`. Alphabetic zone abbreviations are
/// taken as offset zero; `+HHMM`/`-HHMM` offsets are applied. Blank input is
/// `Ok(None)`.
pub fn parse_timestamp(value: &str) -> Result<Option<DateTime<Utc>>, TimestampError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let fail = |reason: String| TimestampError {
        value: value.to_string(),
        reason,
    };

    let (datetime, zone) = trimmed
        .rsplit_once(' ')
        .ok_or_else(|| fail("missing time zone".to_string()))?;
    let naive = NaiveDateTime::parse_from_str(datetime.trim(), TIMESTAMP_FORMAT)
        .map_err(|err| fail(err.to_string()))?;

    if !zone.is_empty() && zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(Some(Utc.from_utc_datetime(&naive)));
    }
    let offset = parse_offset(zone).ok_or_else(|| fail(format!("unknown time zone {zone:?}")))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .ok_or_else(|| fail("ambiguous local time".to_string()))
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Collaborators and attribution used while finalizing items.
#[derive(Clone, Copy, Default)]
pub struct FinalizeContext<'a> {
    /// Endpoint the items were fetched from; used as issue context.
    pub source: &'a str,
    pub tidy: Option<&'a dyn TidySink>,
    pub front_matter: Option<&'a dyn FrontMatterParser>,
}

impl ItemRecord {
    /// Produces the finalized item at position `index`.
    ///
    /// Tidy rules run in a fixed order: a content that is nothing but a URL
    /// is replaced by the description, then a content equal to the
    /// description blanks the description.
    pub fn finalize(self, index: usize, ctx: FinalizeContext<'_>) -> Item {
        let mut record = self;
        let mut edits = Vec::new();
        let mut note = |edit: String| {
            if let Some(tidy) = ctx.tidy {
                tidy.on_tidy(&edit);
            }
            edits.push(edit);
        };

        if is_standalone_url(&record.content) {
            note(format!(
                "Item[{index}].Content was a URL {:?}, replaced with Description",
                record.content
            ));
            record.content = record.description.clone();
        }

        if record.content == record.description {
            note(format!(
                "Item[{index}].Content was the same as the Description, set Description to blank"
            ));
            record.description.clear();
        }

        let mut issues = Vec::new();
        let mut timestamp = |label: &str, raw: &str| match parse_timestamp(raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                issues.push(
                    Issue::error(
                        ctx.source,
                        codes::INVALID_TIMESTAMP,
                        format!("Item[{index}].{label}: {err}"),
                    )
                    .for_item(index),
                );
                None
            }
        };
        let created_on = timestamp("CreatedAt", &record.created_at);
        let updated_on = timestamp("UpdatedAt", &record.updated_at);
        let deleted_on = timestamp("DeletedAt", &record.deleted_at);

        let front_matter = match ctx.front_matter.map(|parser| parser.parse(&record.content)) {
            Some(Ok(parsed)) => parsed,
            Some(Err(err)) => {
                issues.push(
                    Issue::error(
                        ctx.source,
                        codes::FRONT_MATTER_INVALID,
                        format!("Item[{index}].Content front matter: {err}"),
                    )
                    .for_item(index),
                );
                None
            }
            None => None,
        };

        Item {
            record,
            source: ctx.source.to_string(),
            index,
            edits,
            created_on,
            updated_on,
            deleted_on,
            front_matter,
            traversal: LinkTraversal::NotAttempted,
            issues,
        }
    }
}

/// True when the whole text is a single absolute URL with a host.
fn is_standalone_url(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return false;
    }
    Url::parse(trimmed).is_ok_and(|url| url.has_host())
}

/// An item's display title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Title<'a>(&'a str);

impl<'a> Title<'a> {
    pub fn original(&self) -> &'a str {
        self.0
    }

    /// Drops a trailing source name such as `" | Healthcare IT News"`.
    pub fn clean(&self) -> &'a str {
        match self.0.find(" | ") {
            Some(pos) => &self.0[..pos],
            None => self.0,
        }
    }
}

/// A finalized bookmark: tidied fields plus derived state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    record: ItemRecord,
    source: String,
    index: usize,
    edits: Vec<String>,
    created_on: Option<DateTime<Utc>>,
    updated_on: Option<DateTime<Utc>>,
    deleted_on: Option<DateTime<Utc>>,
    front_matter: Option<FrontMatter>,
    traversal: LinkTraversal,
    issues: Vec<Issue>,
}

impl Item {
    /// Tidied API fields.
    pub fn record(&self) -> &ItemRecord {
        &self.record
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn kind(&self) -> &str {
        &self.record.kind
    }

    /// Tidy notes, in the order they were applied.
    pub fn edits(&self) -> &[String] {
        &self.edits
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn traversal(&self) -> &LinkTraversal {
        &self.traversal
    }

    pub fn title(&self) -> Title<'_> {
        Title(&self.record.name)
    }

    pub fn summary(&self) -> &str {
        &self.record.description
    }

    /// Raw content after tidying, including any front matter.
    pub fn content(&self) -> &str {
        &self.record.content
    }

    /// Content with front matter removed.
    pub fn body(&self) -> &str {
        match &self.front_matter {
            Some(front_matter) => &front_matter.body,
            None => &self.record.content,
        }
    }

    pub fn front_matter(&self) -> Option<&FrontMatter> {
        self.front_matter.as_ref()
    }

    pub fn first_sentence_of_body(
        &self,
        splitter: &dyn FirstSentence,
    ) -> Result<String, SentenceError> {
        splitter.first_sentence(self.body())
    }

    /// Tag names.
    pub fn categories(&self) -> Vec<&str> {
        self.record.tags.iter().map(|tag| tag.name.as_str()).collect()
    }

    pub fn created_on(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }

    pub fn updated_on(&self) -> Option<DateTime<Utc>> {
        self.updated_on
    }

    pub fn deleted_on(&self) -> Option<DateTime<Utc>> {
        self.deleted_on
    }

    pub fn is_deleted(&self) -> bool {
        !self.record.deleted_at.is_empty()
    }

    pub fn featured_image_url(&self) -> Option<&str> {
        if !self.record.thumbnail_url.is_empty() {
            return Some(&self.record.thumbnail_url);
        }
        self.record
            .thumbnails
            .as_ref()
            .map(|thumbs| thumbs.large.as_str())
            .filter(|large| !large.is_empty())
    }

    pub fn original_url(&self) -> &str {
        &self.record.link
    }

    /// The resolved destination when traversal succeeded, otherwise the
    /// original link.
    pub fn final_url(&self) -> Result<Url, url::ParseError> {
        match self.traversal.resolved() {
            Some(link) => Ok(link.final_url.clone()),
            None => Url::parse(self.record.link.trim()),
        }
    }

    /// Item-level traversal predicate. Every rejection is reported through
    /// `warn` with its stable code.
    pub fn is_traversable(&self, warn: &mut dyn FnMut(&str, String)) -> bool {
        if !self.record.deleted_at.is_empty() {
            warn(
                codes::ITEM_DELETED,
                "Item marked as deleted, not traversable".to_string(),
            );
            return false;
        }
        if self.record.kind != LINK_ITEM_TYPE {
            warn(
                codes::ITEM_NOT_LINK,
                format!(
                    "Item 'type' is {:?} not {LINK_ITEM_TYPE:?}, not traversable",
                    self.record.kind
                ),
            );
            return false;
        }
        if self.record.link.trim().is_empty() {
            warn(codes::LINK_EMPTY, "Empty link, not traversable".to_string());
            return false;
        }
        true
    }

    /// Resolves the item's link once. Later calls are no-ops.
    ///
    /// `traverse` is only invoked when `traversable` accepts the item; a
    /// traversal failure is recorded as an item error.
    pub async fn traverse_link<P, F, Fut>(&mut self, traversable: P, traverse: F)
    where
        P: FnOnce(&Item) -> bool,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<ResolvedLink, TraversalError>>,
    {
        if self.traversal.is_attempted() {
            return;
        }
        if !traversable(&*self) {
            self.traversal = LinkTraversal::Untraversable;
            return;
        }

        match traverse(self.record.link.clone()).await {
            Ok(link) => self.traversal = LinkTraversal::Resolved(link),
            Err(err) => {
                let message = format!(
                    "unable to traverse Item[{}] link {:?}: {err}",
                    self.index, self.record.link
                );
                self.record_issue(Issue::error(
                    self.source.clone(),
                    codes::LINK_TRAVERSAL_FAILED,
                    message,
                ));
                self.traversal = LinkTraversal::Failed(err);
            }
        }
    }

    /// Appends an issue attributed to this item.
    pub fn record_issue(&mut self, issue: Issue) {
        self.issues.push(issue.for_item(self.index));
    }
}
