use std::sync::Arc;

use dropmark_core::{Collection, CollectionPayload, FinalizeContext, Issue, Item, ItemRecord};
use dropmark_logging::{dropmark_debug, dropmark_error, dropmark_warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::options::{Concurrency, ImportOptions};

/// Finalizes every decoded item and assembles the collection.
///
/// Item progress is bracketed by one start and one complete call, with one
/// increment per finished item: in item order when sequential, in completion
/// order when concurrent. The returned items are always in payload order.
pub async fn finalize_collection(
    source: &str,
    payload: CollectionPayload,
    issues: Vec<Issue>,
    options: &ImportOptions,
) -> Collection {
    let CollectionPayload {
        name,
        items: records,
    } = payload;
    let total = records.len();
    let progress = options.item_progress.clone();

    progress.start_items(
        &format!("Importing {total} Dropmark links from {source:?}"),
        total,
    );

    let items = match options.concurrency {
        Concurrency::Sequential => {
            let mut items = Vec::with_capacity(total);
            for (index, record) in records.into_iter().enumerate() {
                items.push(finalize_item(source, index, record, options).await);
                progress.increment_items(1);
            }
            items
        }
        Concurrency::Concurrent { limit } => {
            let shared = Arc::new(options.clone());
            let source_owned: Arc<str> = Arc::from(source);
            let permits = limit.map(|limit| Arc::new(Semaphore::new(limit.get())));

            let mut tasks = JoinSet::new();
            for (index, record) in records.into_iter().enumerate() {
                let options = shared.clone();
                let source = source_owned.clone();
                let permits = permits.clone();
                tasks.spawn(async move {
                    let _permit = match permits {
                        Some(permits) => permits.acquire_owned().await.ok(),
                        None => None,
                    };
                    finalize_item(&source, index, record, &options).await
                });
            }

            let mut items = Vec::with_capacity(total);
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(item) => {
                        progress.increment_items(1);
                        items.push(item);
                    }
                    Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                    // Tasks are never aborted; cancellation means the runtime is shutting down.
                    Err(err) => {
                        dropmark_error!("finalize task for {source} was cancelled: {err}");
                        panic!("finalize task for {source} was cancelled: {err}");
                    }
                }
            }
            items.sort_by_key(Item::index);
            items
        }
    };

    progress.complete_items(&format!(
        "Imported {total} Dropmark links from {source:?}"
    ));

    Collection::new(source, name, items, issues)
}

async fn finalize_item(
    source: &str,
    index: usize,
    record: ItemRecord,
    options: &ImportOptions,
) -> Item {
    let ctx = FinalizeContext {
        source,
        tidy: options.tidy.as_deref(),
        front_matter: options.front_matter.as_deref(),
    };
    let mut item = record.finalize(index, ctx);
    dropmark_debug!(
        "finalized item {} ({} edits) from {}",
        index,
        item.edits().len(),
        source
    );

    if let Some(traverser) = options.link_traverser.as_deref() {
        let mut warnings: Vec<(String, String)> = Vec::new();
        item.traverse_link(
            |item| {
                let mut warn = |code: &str, message: String| {
                    warnings.push((code.to_string(), format!("{message} (item {index})")));
                };
                let suggested = item.is_traversable(&mut warn);
                let accepted =
                    traverser.is_url_traversable(item.original_url(), suggested, &mut warn);
                suggested && accepted
            },
            |url| async move { traverser.traverse_link(&url).await },
        )
        .await;
        for (code, message) in warnings {
            item.record_issue(Issue::warning(source, code, message));
        }
    }

    for issue in item.issues() {
        if issue.is_error() {
            dropmark_warn!("{} item {}: {}", source, index, issue);
        } else {
            dropmark_debug!("{} item {}: {}", source, index, issue);
        }
        options.report(issue);
    }
    item
}
