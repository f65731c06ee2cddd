use crate::{
    annotate::Annotator,
    backend::{InferenceBackend, InferenceOutput},
    config::InferenceConfig,
    processing::{
        post::{Detection, PostProcessor, TransformParams},
        pre::PreProcessor,
    },
};
use anyhow::Context;
use image::ImageFormat;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

/// Result of one prediction: where the annotated image landed and what was
/// found.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub save_dir: PathBuf,
    pub image_path: PathBuf,
    pub detections: Vec<Detection>,
}

/// Runs detection on an image file and persists an annotated copy.
///
/// Implementations are shared across request handlers, hence `Send + Sync`.
pub trait Detector: Send + Sync {
    /// Detect objects in `source` and write the annotated image into
    /// `save_dir` (created if absent) as `<source stem>.jpg`.
    fn predict(&self, source: &Path, save_dir: &Path) -> anyhow::Result<Prediction>;
}

struct Pipeline<B> {
    backend: B,
    preprocessor: PreProcessor,
}

struct Metrics {
    duration: Histogram<f64>,
    images: Counter<u64>,
    detections: Counter<u64>,
}

impl Metrics {
    fn init(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];
        Self {
            duration: meter
                .f64_histogram("inference_duration_seconds")
                .with_description("Time to process one image (decode + infer + annotate + save)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            images: meter
                .u64_counter("inference_images_total")
                .with_description("Total images processed")
                .build(),
            detections: meter
                .u64_counter("inference_detections_total")
                .with_description("Total detections produced")
                .build(),
        }
    }
}

pub struct DetectionService<B: InferenceBackend> {
    pipeline: Mutex<Pipeline<B>>,
    postprocessor: PostProcessor,
    annotator: Annotator,
    metrics: Metrics,
}

impl<B: InferenceBackend> DetectionService<B> {
    pub fn new(backend: B, config: &InferenceConfig) -> anyhow::Result<Self> {
        let annotator = Annotator::new(backend.class_names())?;
        Ok(Self {
            pipeline: Mutex::new(Pipeline {
                backend,
                preprocessor: PreProcessor::new(config.input_size),
            }),
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
            annotator,
            metrics: Metrics::init("inference"),
        })
    }

    fn detect(&self, image: &image::RgbImage) -> anyhow::Result<Vec<Detection>> {
        let mut pipeline = self
            .pipeline
            .lock()
            .map_err(|_| anyhow::anyhow!("Inference pipeline lock poisoned"))?;
        let Pipeline {
            backend,
            preprocessor,
        } = &mut *pipeline;

        let (input, letterbox) = preprocessor.preprocess_image(image)?;

        let InferenceOutput { predictions } = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            backend.infer(&input)?
        };

        let transform = TransformParams {
            orig_width: image.width(),
            orig_height: image.height(),
            letterbox,
        };

        self.postprocessor
            .parse_detections(&predictions.view(), &transform)
    }
}

impl<B: InferenceBackend + Send> Detector for DetectionService<B> {
    fn predict(&self, source: &Path, save_dir: &Path) -> anyhow::Result<Prediction> {
        let _span = tracing::info_span!("predict", source = %source.display()).entered();
        let start = Instant::now();

        let mut image = image::ImageReader::open(source)
            .with_context(|| format!("Failed to open {}", source.display()))?
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("Failed to decode image {}", source.display()))?
            .to_rgb8();

        let detections = self.detect(&image)?;

        self.annotator.draw(&mut image, &detections);

        fs::create_dir_all(save_dir)
            .with_context(|| format!("Failed to create {}", save_dir.display()))?;

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("prediction");
        let image_path = save_dir.join(format!("{stem}.jpg"));

        image
            .save_with_format(&image_path, ImageFormat::Jpeg)
            .with_context(|| format!("Failed to write {}", image_path.display()))?;

        let elapsed = start.elapsed();
        self.metrics.duration.record(elapsed.as_secs_f64(), &[]);
        self.metrics.images.add(1, &[]);
        self.metrics.detections.add(detections.len() as u64, &[]);

        tracing::info!(
            detections = detections.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            output = %image_path.display(),
            "Prediction complete"
        );

        Ok(Prediction {
            save_dir: save_dir.to_path_buf(),
            image_path,
            detections,
        })
    }
}
