use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use dropmark_core::{
    codes, CollectionPayload, KeyValueFrontMatter, LinkTraversal, ResolvedLink, TraversalError,
};
use dropmark_engine::{finalize_collection, Concurrency, ImportOptions, ItemProgress, LinkTraverser};
use pretty_assertions::assert_eq;
use url::Url;

const SOURCE: &str = "https://app.dropmark.com/652682.json";

const PAYLOAD: &str = r#"{
    "name": "Mixed bag",
    "items": [
        {"id": 10, "type": "link", "link": "https://slow.example/a",
         "description": "Slow one.", "content": "https://slow.example/a"},
        {"id": 11, "type": "link", "link": "https://bit.ly/2SsJ4tW",
         "description": "Shortened.", "content": "Shortened."},
        {"id": 12, "type": "link", "link": "https://broken.example/x"},
        {"id": 13, "type": "text", "content": "---\ntitle: Note\n---\nA note."},
        {"id": 14, "type": "link", "link": "https://gone.example/",
         "deleted_at": "2019-03-01 12:00:00 EST"},
        {"id": 15, "type": "link", "link": "  "},
        {"id": 16, "type": "link", "link": "https://fast.example/b",
         "created_at": "yesterday at noon"}
    ]
}"#;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(dropmark_logging::initialize_for_tests);
}

fn payload() -> CollectionPayload {
    CollectionPayload::from_json(PAYLOAD.as_bytes()).expect("payload decodes")
}

/// Resolves every link to `https://resolved.example/<host>`, except hosts
/// named `broken.*`. Links on `slow.*` hosts take longest so that concurrent
/// runs complete out of order.
#[derive(Default)]
struct FakeTraverser {
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl LinkTraverser for FakeTraverser {
    async fn traverse_link(&self, url: &str) -> Result<ResolvedLink, TraversalError> {
        self.calls.lock().unwrap().push(url.to_string());
        let parsed = Url::parse(url).map_err(|err| TraversalError::InvalidUrl(err.to_string()))?;
        let host = parsed.host_str().unwrap_or_default().to_string();
        if host.starts_with("slow.") {
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        if host.starts_with("broken.") {
            return Err(TraversalError::HttpStatus(404));
        }
        Ok(ResolvedLink {
            original_url: url.to_string(),
            final_url: Url::parse(&format!("https://resolved.example/{host}")).unwrap(),
            redirect_count: 1,
            content_type: Some("text/html".to_string()),
        })
    }
}

#[derive(Default)]
struct CountingProgress {
    started: Mutex<Vec<usize>>,
    increments: Mutex<usize>,
    completed: Mutex<usize>,
}

impl ItemProgress for CountingProgress {
    fn start_items(&self, _summary: &str, expected: usize) {
        self.started.lock().unwrap().push(expected);
    }

    fn increment_items(&self, by: usize) {
        *self.increments.lock().unwrap() += by;
    }

    fn complete_items(&self, _summary: &str) {
        *self.completed.lock().unwrap() += 1;
    }
}

fn options_with(traverser: Arc<FakeTraverser>, concurrency: Concurrency) -> ImportOptions {
    ImportOptions::new()
        .with_link_traverser(traverser)
        .with_front_matter(Arc::new(KeyValueFrontMatter))
        .with_concurrency(concurrency)
}

#[tokio::test]
async fn concurrent_finalize_matches_sequential() {
    init_logging();
    let sequential = finalize_collection(
        SOURCE,
        payload(),
        Vec::new(),
        &options_with(Arc::default(), Concurrency::Sequential),
    )
    .await;

    for limit in [None, NonZeroUsize::new(2)] {
        let concurrent = finalize_collection(
            SOURCE,
            payload(),
            Vec::new(),
            &options_with(Arc::default(), Concurrency::Concurrent { limit }),
        )
        .await;
        assert_eq!(concurrent.items(), sequential.items());
        assert_eq!(concurrent.issues(), sequential.issues());
    }

    let indices: Vec<usize> = sequential.items().iter().map(|item| item.index()).collect();
    assert_eq!(indices, (0..7).collect::<Vec<_>>());
}

#[tokio::test]
async fn item_progress_counts_every_item_once() {
    init_logging();
    for concurrency in [
        Concurrency::Sequential,
        Concurrency::Concurrent { limit: None },
        Concurrency::Concurrent {
            limit: NonZeroUsize::new(2),
        },
    ] {
        let progress = Arc::new(CountingProgress::default());
        let options =
            options_with(Arc::default(), concurrency).with_item_progress(progress.clone());

        let collection = finalize_collection(SOURCE, payload(), Vec::new(), &options).await;

        assert_eq!(collection.len(), 7, "{concurrency:?}");
        assert_eq!(*progress.started.lock().unwrap(), vec![7], "{concurrency:?}");
        assert_eq!(*progress.increments.lock().unwrap(), 7, "{concurrency:?}");
        assert_eq!(*progress.completed.lock().unwrap(), 1, "{concurrency:?}");
    }
}

#[tokio::test]
async fn only_traversable_items_reach_the_traverser() {
    init_logging();
    let traverser = Arc::new(FakeTraverser::default());
    let collection = finalize_collection(
        SOURCE,
        payload(),
        Vec::new(),
        &options_with(traverser.clone(), Concurrency::Sequential),
    )
    .await;

    assert_eq!(
        *traverser.calls.lock().unwrap(),
        vec![
            "https://slow.example/a",
            "https://bit.ly/2SsJ4tW",
            "https://broken.example/x",
            "https://fast.example/b",
        ]
    );

    let states: Vec<bool> = collection
        .items()
        .iter()
        .map(|item| item.traversal().is_traversable())
        .collect();
    assert_eq!(states, vec![true, true, true, false, false, false, true]);
    assert_eq!(
        collection.item(1).unwrap().final_url().unwrap().as_str(),
        "https://resolved.example/bit.ly"
    );
    assert_eq!(
        *collection.item(4).unwrap().traversal(),
        LinkTraversal::Untraversable
    );
}

#[tokio::test]
async fn traversal_failure_stays_on_its_item() {
    init_logging();
    let reported: Arc<Mutex<Vec<(String, Option<usize>)>>> = Arc::default();
    let sink = reported.clone();
    let options = options_with(Arc::default(), Concurrency::Concurrent { limit: None })
        .with_error_sink(Arc::new(move |code: &str, issue: &dropmark_core::Issue| {
            sink.lock()
                .unwrap()
                .push((code.to_string(), issue.item_index()));
        }));

    let collection = finalize_collection(SOURCE, payload(), Vec::new(), &options).await;

    let broken = collection.item(2).unwrap();
    assert_eq!(broken.traversal().error(), Some(&TraversalError::HttpStatus(404)));
    assert_eq!(
        broken.errors().map(|issue| issue.code()).collect::<Vec<_>>(),
        vec![codes::LINK_TRAVERSAL_FAILED]
    );
    assert_eq!(
        broken.final_url().unwrap().as_str(),
        "https://broken.example/x"
    );
    assert!(collection.item(0).unwrap().traversal().resolved().is_some());

    let mut reported = reported.lock().unwrap().clone();
    reported.sort();
    assert_eq!(
        reported,
        vec![
            (codes::LINK_TRAVERSAL_FAILED.to_string(), Some(2)),
            (codes::INVALID_TIMESTAMP.to_string(), Some(6)),
        ]
    );
}

#[tokio::test]
async fn rejections_are_reported_as_item_warnings() {
    init_logging();
    let warnings: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
    let sink = warnings.clone();
    let options = options_with(Arc::default(), Concurrency::Sequential).with_warning_sink(
        Arc::new(move |code: &str, message: &str| {
            sink.lock()
                .unwrap()
                .push((code.to_string(), message.to_string()));
        }),
    );

    let collection = finalize_collection(SOURCE, payload(), Vec::new(), &options).await;

    let codes_seen: Vec<String> = warnings
        .lock()
        .unwrap()
        .iter()
        .map(|(code, _)| code.clone())
        .collect();
    assert_eq!(
        codes_seen,
        vec![
            codes::ITEM_NOT_LINK.to_string(),
            codes::ITEM_DELETED.to_string(),
            codes::LINK_EMPTY.to_string(),
        ]
    );
    assert!(warnings.lock().unwrap()[0].1.ends_with("(item 3)"));

    let attributed: Vec<Option<usize>> = collection
        .warnings()
        .iter()
        .map(|issue| issue.item_index())
        .collect();
    assert_eq!(attributed, vec![Some(3), Some(4), Some(5)]);
}

#[tokio::test]
async fn without_traverser_links_are_left_alone() {
    init_logging();
    let collection =
        finalize_collection(SOURCE, payload(), Vec::new(), &ImportOptions::default()).await;

    assert!(collection
        .items()
        .iter()
        .all(|item| *item.traversal() == LinkTraversal::NotAttempted));
    assert!(collection.warnings().is_empty());
    assert_eq!(
        collection.item(1).unwrap().final_url().unwrap().as_str(),
        "https://bit.ly/2SsJ4tW"
    );
}

#[tokio::test]
async fn tidy_notes_and_front_matter_flow_through_options() {
    init_logging();
    let notes: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = notes.clone();
    let concurrency = Concurrency::Concurrent {
        limit: NonZeroUsize::new(3),
    };
    let options =
        options_with(Arc::default(), concurrency).with_tidy_sink(Arc::new(move |edit: &str| {
            sink.lock().unwrap().push(edit.to_string());
        }));

    let collection = finalize_collection(SOURCE, payload(), Vec::new(), &options).await;

    let mut notes = notes.lock().unwrap().clone();
    notes.sort();
    assert_eq!(
        notes,
        vec![
            "Item[0].Content was a URL \"https://slow.example/a\", replaced with Description"
                .to_string(),
            "Item[0].Content was the same as the Description, set Description to blank"
                .to_string(),
            "Item[1].Content was the same as the Description, set Description to blank"
                .to_string(),
            "Item[2].Content was the same as the Description, set Description to blank"
                .to_string(),
            "Item[4].Content was the same as the Description, set Description to blank"
                .to_string(),
            "Item[5].Content was the same as the Description, set Description to blank"
                .to_string(),
            "Item[6].Content was the same as the Description, set Description to blank"
                .to_string(),
        ]
    );

    let note = collection.item(3).unwrap();
    let front_matter = note.front_matter().expect("front matter parsed");
    assert_eq!(
        front_matter.fields.get("title").map(String::as_str),
        Some("Note")
    );
    assert_eq!(note.body(), "A note.");
}

#[tokio::test]
async fn payload_issues_precede_item_issues() {
    init_logging();
    let leading = dropmark_core::Issue::warning(SOURCE, codes::UNRECOGNIZED_API_ENDPOINT, "odd");
    let collection =
        finalize_collection(SOURCE, payload(), vec![leading.clone()], &ImportOptions::default())
            .await;

    assert_eq!(collection.issues()[0], leading);
    assert_eq!(collection.issue_counts().0, 2);
}

struct PanickingTraverser;

#[async_trait::async_trait]
impl LinkTraverser for PanickingTraverser {
    async fn traverse_link(&self, url: &str) -> Result<ResolvedLink, TraversalError> {
        panic!("traverser blew up on {url}");
    }
}

#[tokio::test]
#[should_panic(expected = "traverser blew up")]
async fn failed_task_never_yields_a_shorter_collection() {
    init_logging();
    let options = ImportOptions::new()
        .with_link_traverser(Arc::new(PanickingTraverser))
        .with_concurrency(Concurrency::Concurrent { limit: None });

    let collection = finalize_collection(SOURCE, payload(), Vec::new(), &options).await;
    assert_eq!(collection.len(), 7);
}
