use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use rendition_worker::config::WorkerConfig;
use rendition_worker::error::{PipelineError, StorageError};
use rendition_worker::services::processor::RenditionProcessor;
use rendition_worker::services::renditions::{
    RenditionGenerator, RenditionKind, RenditionSpec, default_policy,
};
use rendition_worker::services::storage::ObjectStore;
use rendition_worker::services::transform::{Watermark, resolve_font_path};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory object store with injectable per-key put failures.
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failing_puts: Mutex<HashSet<String>>,
}

impl MemoryStore {
    fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    fn fail_put(&self, key: &str) {
        self.failing_puts.lock().unwrap().insert(key.to_string());
    }

    fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        if self.failing_puts.lock().unwrap().contains(key) {
            return Err(StorageError::Transient("injected failure".to_string()));
        }
        self.insert(bucket, key, data);
        Ok(())
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([120, 160, 40, 255]),
    ));
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn test_config(scratch: &Path) -> Arc<WorkerConfig> {
    Arc::new(WorkerConfig {
        output_bucket: "out".to_string(),
        scratch_dir: scratch.to_path_buf(),
        processing_delay: Duration::ZERO,
        ..WorkerConfig::default()
    })
}

/// The fixed policy minus the watermark entry, for tests that must not
/// depend on a system font being installed.
fn resize_only_policy() -> Vec<RenditionSpec> {
    default_policy()
        .into_iter()
        .filter(|spec| matches!(spec.kind, RenditionKind::Fit { .. }))
        .collect()
}

fn load_watermark() -> Option<Watermark> {
    let path = resolve_font_path(None)?;
    let data = std::fs::read(path).ok()?;
    Watermark::new(data, "NewTextSigned").ok()
}

fn notification(records: &[(&str, &str)]) -> String {
    let records: Vec<serde_json::Value> = records
        .iter()
        .map(|(bucket, key)| {
            serde_json::json!({
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": bucket },
                    "object": { "key": key, "size": 1 }
                }
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}

fn scratch_entries(scratch: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(scratch)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect()
}

#[tokio::test]
async fn test_full_notification_end_to_end() {
    let Some(watermark) = load_watermark() else {
        eprintln!("skipping: no system font available");
        return;
    };

    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    store.insert("in", "photos/cat.png", png_bytes(640, 480));

    let generator = RenditionGenerator::new(default_policy(), 90, Some(watermark));
    let processor = RenditionProcessor::new(store.clone(), test_config(scratch.path()), generator);

    processor
        .dispatch(&notification(&[("in", "photos/cat.png")]))
        .await
        .unwrap();

    assert_eq!(
        store.keys("out"),
        [
            "photos/cat_large.png",
            "photos/cat_medium.png",
            "photos/cat_small.png",
            "photos/cat_text.png",
        ]
    );
    assert!(
        scratch_entries(scratch.path()).is_empty(),
        "scratch should be empty after full success"
    );
}

#[tokio::test]
async fn test_upload_failure_is_isolated() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    store.insert("in", "photos/cat.png", png_bytes(640, 480));
    store.fail_put("photos/cat_medium.png");

    let generator = RenditionGenerator::new(resize_only_policy(), 90, None);
    let processor = RenditionProcessor::new(store.clone(), test_config(scratch.path()), generator);

    let outcome = processor.process_record("in", "photos/cat.png").await.unwrap();

    assert_eq!(outcome.uploaded(), 2);
    assert_eq!(outcome.failed(), 1);
    let failed: Vec<_> = outcome
        .uploads
        .iter()
        .filter(|u| u.result.is_err())
        .map(|u| u.key.as_str())
        .collect();
    assert_eq!(failed, ["photos/cat_medium.png"]);

    assert_eq!(
        store.keys("out"),
        ["photos/cat_large.png", "photos/cat_small.png"]
    );

    // The failed rendition's local file is kept for inspection, the staged
    // source and the uploaded renditions are gone.
    let dirs = scratch_entries(scratch.path());
    assert_eq!(dirs.len(), 1);
    let kept: Vec<String> = std::fs::read_dir(&dirs[0])
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(kept, ["cat_medium.png"]);
}

#[tokio::test]
async fn test_fetch_failure_aborts_invocation() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());

    let generator = RenditionGenerator::new(resize_only_policy(), 90, None);
    let processor = RenditionProcessor::new(store.clone(), test_config(scratch.path()), generator);

    let result = processor.process_record("in", "missing.png").await;

    assert!(matches!(
        result,
        Err(PipelineError::Fetch {
            source: StorageError::NotFound,
            ..
        })
    ));
    assert!(store.keys("out").is_empty());
    assert!(scratch_entries(scratch.path()).is_empty());
}

#[tokio::test]
async fn test_transform_failure_aborts_and_cleans_up() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    store.insert("in", "broken.png", b"not an image at all".to_vec());

    let generator = RenditionGenerator::new(resize_only_policy(), 90, None);
    let processor = RenditionProcessor::new(store.clone(), test_config(scratch.path()), generator);

    let result = processor.process_record("in", "broken.png").await;

    assert!(matches!(result, Err(PipelineError::Transform { .. })));
    assert!(store.keys("out").is_empty());
    assert!(scratch_entries(scratch.path()).is_empty());
}

#[tokio::test]
async fn test_failing_record_does_not_stop_the_next() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    store.insert("in", "photos/cat.png", png_bytes(320, 240));

    let generator = RenditionGenerator::new(resize_only_policy(), 90, None);
    let processor = RenditionProcessor::new(store.clone(), test_config(scratch.path()), generator);

    processor
        .dispatch(&notification(&[
            ("in", "missing.png"),
            ("in", "photos/cat.png"),
        ]))
        .await
        .unwrap();

    assert_eq!(
        store.keys("out"),
        [
            "photos/cat_large.png",
            "photos/cat_medium.png",
            "photos/cat_small.png",
        ]
    );
}

#[tokio::test]
async fn test_malformed_payload_is_a_hard_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());

    let generator = RenditionGenerator::new(resize_only_policy(), 90, None);
    let processor = RenditionProcessor::new(store, test_config(scratch.path()), generator);

    let result = processor.dispatch("definitely not json").await;
    assert!(matches!(result, Err(PipelineError::Deserialization(_))));
}

#[tokio::test]
async fn test_root_level_key_uploads_to_bucket_root() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    store.insert("in", "cat.png", png_bytes(320, 240));

    let generator = RenditionGenerator::new(resize_only_policy(), 90, None);
    let processor = RenditionProcessor::new(store.clone(), test_config(scratch.path()), generator);

    processor.process_record("in", "cat.png").await.unwrap();

    assert_eq!(
        store.keys("out"),
        ["cat_large.png", "cat_medium.png", "cat_small.png"]
    );
}

#[tokio::test]
async fn test_key_without_extension_gets_the_default() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    store.insert("in", "photos/cat", png_bytes(320, 240));

    let generator = RenditionGenerator::new(resize_only_policy(), 90, None);
    let processor = RenditionProcessor::new(store.clone(), test_config(scratch.path()), generator);

    processor.process_record("in", "photos/cat").await.unwrap();

    assert_eq!(
        store.keys("out"),
        [
            "photos/cat_large.png",
            "photos/cat_medium.png",
            "photos/cat_small.png",
        ]
    );
}
