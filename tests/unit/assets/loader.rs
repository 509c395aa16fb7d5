use std::io::Cursor;
use std::sync::atomic::AtomicUsize;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use super::*;

fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Serves a PNG for every uri except those starting with `broken`.
#[derive(Default)]
struct CountingSource {
    calls: AtomicUsize,
}

impl AssetSource for CountingSource {
    fn fetch(&self, uri: &str) -> BannerResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if uri.starts_with("broken") {
            return Err(BannerError::evaluation(format!("404 for {uri}")));
        }
        if uri.starts_with("garbage") {
            return Ok(b"not an image".to_vec());
        }
        Ok(png_bytes([10, 20, 30, 255]))
    }
}

/// Blocks fetches of `slow*` uris until the test releases them.
struct GatedSource {
    entered: Mutex<Sender<String>>,
    release: Mutex<Receiver<()>>,
}

impl AssetSource for GatedSource {
    fn fetch(&self, uri: &str) -> BannerResult<Vec<u8>> {
        if uri.starts_with("slow") {
            let _ = self.entered.lock().unwrap().send(uri.to_string());
            self.release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(10))
                .map_err(|_| BannerError::evaluation("gate never released"))?;
        }
        Ok(png_bytes([200, 0, 0, 255]))
    }
}

fn loader_with(source: Arc<dyn AssetSource>) -> AssetLoader {
    AssetLoader::new(source, AssetLoaderOpts { threads: Some(4) }).unwrap()
}

#[test]
fn uri_set_identity_ignores_order_and_duplicates() {
    let a = UriSet::new(["b.png", "a.png", "a.png", " "]);
    let b = UriSet::new(["a.png", "b.png"]);
    assert_eq!(a.len(), 2);
    assert!(a.same_identity(&b));
    assert_eq!(a.key(), b.key());
    assert_eq!(a.iter().collect::<Vec<_>>(), vec!["b.png", "a.png"]);
    assert!(!a.same_identity(&UriSet::new(["a.png"])));
}

#[test]
fn failed_uris_degrade_to_none_without_failing_the_batch() {
    let source = Arc::new(CountingSource::default());
    let failures = Arc::new(Mutex::new(Vec::<AssetFailure>::new()));
    let sink = failures.clone();
    let loader = AssetLoader::with_diagnostics(
        source,
        AssetLoaderOpts { threads: Some(2) },
        Arc::new(move |f: &AssetFailure| sink.lock().unwrap().push(f.clone())),
    )
    .unwrap();

    let uris = UriSet::new(["ok.png", "broken.png", "garbage.png"]);
    let outcome = loader.load(&uris, |_| {});
    let assets = outcome.assets().expect("committed").clone();

    assert!(!assets.all_succeeded());
    assert!(assets.image("ok.png").is_some());
    assert!(assets.get("broken.png").unwrap().image.is_none());
    assert!(assets.get("garbage.png").unwrap().image.is_none());

    let mut uris_failed: Vec<_> = failures
        .lock()
        .unwrap()
        .iter()
        .map(|f| f.uri.clone())
        .collect();
    uris_failed.sort();
    assert_eq!(uris_failed, vec!["broken.png", "garbage.png"]);
}

#[test]
fn progress_events_count_up_to_total() {
    let loader = loader_with(Arc::new(CountingSource::default()));
    let uris = UriSet::new(["a.png", "b.png", "c.png"]);
    let mut progress = Vec::new();
    let mut finished = false;
    loader.load(&uris, |e| match e {
        LoadEvent::Started { total, .. } => assert_eq!(total, 3),
        LoadEvent::Resolved { progress: p, .. } => progress.push(p.completed),
        LoadEvent::Finished { all_succeeded, .. } => {
            assert!(all_succeeded);
            finished = true;
        }
    });
    assert_eq!(progress, vec![1, 2, 3]);
    assert!(finished);
    assert_eq!(
        LoadProgress {
            completed: 1,
            total: 3
        }
        .percent(),
        33
    );
    assert_eq!(
        LoadProgress {
            completed: 0,
            total: 0
        }
        .percent(),
        100
    );
}

#[test]
fn identical_set_in_any_order_is_served_from_cache() {
    let source = Arc::new(CountingSource::default());
    let loader = loader_with(source.clone());

    let first = loader.load(&UriSet::new(["a.png", "b.png"]), |_| {});
    assert!(matches!(first, LoadOutcome::Committed(_)));
    let fetched = source.calls.load(Ordering::SeqCst);
    assert_eq!(fetched, 2);

    let mut events = 0;
    let second = loader.load(&UriSet::new(["b.png", "a.png"]), |_| events += 1);
    assert!(matches!(second, LoadOutcome::Cached(_)));
    assert_eq!(source.calls.load(Ordering::SeqCst), fetched);
    assert_eq!(loader.fetch_count(), 2);
    assert_eq!(events, 0);
}

#[test]
fn changed_set_reuses_decoded_images_per_uri() {
    let source = Arc::new(CountingSource::default());
    let loader = loader_with(source.clone());

    loader.load(&UriSet::new(["a.png", "b.png"]), |_| {});
    let out = loader.load(&UriSet::new(["a.png", "c.png"]), |_| {});
    assert!(matches!(out, LoadOutcome::Committed(_)));
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(loader.cached_image_count(), 3);
}

#[test]
fn superseded_batch_never_commits() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let loader = loader_with(Arc::new(GatedSource {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    }));

    let batch_a = loader.spawn(UriSet::new(["slow-a.png"]));
    entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();

    let batch_b = loader.load(&UriSet::new(["fast-b.png"]), |_| {});
    let LoadOutcome::Committed(b) = batch_b else {
        panic!("batch B should commit");
    };

    release_tx.send(()).unwrap();
    let outcome_a = batch_a.join().unwrap();
    assert!(outcome_a.is_stale());

    let committed = loader.committed().unwrap();
    assert!(Arc::ptr_eq(&committed, &b));
    assert!(committed.image("fast-b.png").is_some());
    assert!(committed.get("slow-a.png").is_none());
}

#[test]
fn teardown_drops_in_flight_results() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let loader = loader_with(Arc::new(GatedSource {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    }));

    let handle = loader.spawn(UriSet::new(["slow.png"]));
    entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    loader.teardown();
    release_tx.send(()).unwrap();

    assert!(matches!(handle.join().unwrap(), LoadOutcome::TornDown));
    assert!(loader.committed().is_none());
    assert_eq!(loader.cached_image_count(), 0);
    assert!(matches!(
        loader.load(&UriSet::new(["x.png"]), |_| {}),
        LoadOutcome::TornDown
    ));
}

#[test]
fn empty_batch_commits_immediately() {
    let loader = loader_with(Arc::new(CountingSource::default()));
    let out = loader.load(&UriSet::new(Vec::<String>::new()), |_| {});
    let assets = out.assets().unwrap();
    assert!(assets.is_empty());
    assert!(assets.all_succeeded());
}
