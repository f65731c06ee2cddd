use crate::processing::pre::Letterbox;
use std::cmp::Ordering;

/// A detection in original image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub letterbox: Letterbox,
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Decode YOLO head output into detections.
    ///
    /// `predictions` is `[1, 4 + num_classes, num_anchors]`: rows 0..4 hold the
    /// box as cxcywh in model input pixels, the remaining rows hold per-class
    /// scores (already sigmoid-activated by the exported graph).
    #[tracing::instrument(skip(self, predictions, transform))]
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            anyhow::bail!(
                "Unexpected model output shape {:?}, expected [1, 4 + num_classes, num_anchors]",
                shape
            );
        }

        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            // argmax over class scores
            let mut confidence = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 0..num_classes {
                let score = predictions[[0, 4 + c, i]];
                if score > confidence {
                    confidence = score;
                    class_id = c;
                }
            }

            if confidence < self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(
                predictions[[0, 0, i]],
                predictions[[0, 1, i]],
                predictions[[0, 2, i]],
                predictions[[0, 3, i]],
            );

            let (x1, y1) = transform.to_original(x1, y1);
            let (x2, y2) = transform.to_original(x2, y2);

            candidates.push(Detection {
                x1,
                y1,
                x2,
                y2,
                confidence,
                class_id: class_id as u32,
            });
        }

        let mut detections = non_max_suppression(candidates, self.iou_threshold);
        detections.truncate(self.max_detections);

        tracing::debug!(count = detections.len(), "Parsed detections");

        Ok(detections)
    }
}

impl TransformParams {
    /// Undo the letterbox and clamp to the original image bounds.
    fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let lb = &self.letterbox;
        let x = ((x - lb.offset_x) / lb.scale).clamp(0.0, self.orig_width as f32);
        let y = ((y - lb.offset_y) / lb.scale).clamp(0.0, self.orig_height as f32);
        (x, y)
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Greedy class-aware NMS. Output is sorted by descending confidence.
fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
