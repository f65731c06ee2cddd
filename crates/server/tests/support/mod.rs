#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use image::{Rgb, RgbImage};
use inference::{Detection, Detector, Prediction};
use server::{AppState, StoragePaths, router};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub const BOUNDARY: &str = "----detect-test-boundary";
pub const UPLOAD_LIMIT: usize = 1024 * 1024;

/// What the stub detector does when called.
#[derive(Clone, Copy)]
pub enum Behavior {
    /// Write `<stem>.jpg` into the save directory.
    WriteImage,
    /// Create the save directory but write no image.
    WriteNothing,
    /// Return an error.
    Fail,
}

pub struct StubDetector {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
}

impl StubDetector {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for StubDetector {
    fn predict(&self, source: &Path, save_dir: &Path) -> anyhow::Result<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(source.is_file(), "upload must be on disk before inference");

        let stem = source.file_stem().unwrap().to_str().unwrap();
        let image_path = save_dir.join(format!("{stem}.jpg"));

        match self.behavior {
            Behavior::Fail => anyhow::bail!("model failure"),
            Behavior::WriteNothing => std::fs::create_dir_all(save_dir)?,
            Behavior::WriteImage => {
                std::fs::create_dir_all(save_dir)?;
                RgbImage::from_pixel(8, 8, Rgb([255, 56, 56])).save(&image_path)?;
            }
        }

        Ok(Prediction {
            save_dir: save_dir.to_path_buf(),
            image_path,
            detections: vec![Detection {
                x1: 0.0,
                y1: 0.0,
                x2: 4.0,
                y2: 4.0,
                confidence: 0.9,
                class_id: 0,
            }],
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub storage: StoragePaths,
    pub detector: Arc<StubDetector>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new(behavior: Behavior) -> Self {
        Self::with_limit(behavior, UPLOAD_LIMIT)
    }

    pub fn with_limit(behavior: Behavior, upload_limit: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = StoragePaths::new(dir.path().join("static"));
        storage.ensure_dirs().unwrap();

        let detector = StubDetector::new(behavior);
        let state = AppState::new(detector.clone(), storage.clone());

        Self {
            router: router(state, upload_limit),
            storage,
            detector,
            _dir: dir,
        }
    }

    /// Resolve a returned `static/...` URL to its file on disk.
    pub fn resolve_url(&self, url: &str) -> PathBuf {
        let relative = url.strip_prefix("static/").expect("url under static/");
        self.storage.static_root().join(relative)
    }

    pub fn uploaded_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(self.storage.uploads_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }
}

pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(filename: &'a str, content: &'a [u8]) -> Self {
        Self {
            name: "file",
            filename: Some(filename),
            content,
        }
    }
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn predict_request(parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Small but real JPEG, as a browser would upload it.
pub fn sample_jpeg() -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    RgbImage::from_pixel(16, 16, Rgb([10, 200, 30]))
        .write_to(&mut bytes, image::ImageFormat::Jpeg)
        .unwrap();
    bytes.into_inner()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
