//! Dropmark core: collection/item model, tidy rules and diagnostics.
mod collection;
mod endpoint;
mod frontmatter;
mod issue;
mod item;
mod traversal;
mod wire;

pub use collection::{Collection, CollectionPayload};
pub use endpoint::is_valid_api_endpoint;
pub use frontmatter::{FrontMatter, FrontMatterError, FrontMatterParser, KeyValueFrontMatter};
pub use issue::{codes, Issue, Severity};
pub use item::{
    parse_timestamp, FinalizeContext, FirstSentence, Item, ItemRecord, SentenceError, Tag,
    Thumbnails, TidySink, TimestampError, Title, LINK_ITEM_TYPE,
};
pub use traversal::{LinkTraversal, ResolvedLink, TraversalError};
