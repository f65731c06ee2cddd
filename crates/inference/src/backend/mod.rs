use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait InferenceBackend {
    fn load_model(path: &str) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a preprocessed `[1, 3, H, W]` batch.
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;

    /// Class labels indexed by `class_id`. Empty when the model carries none.
    fn class_names(&self) -> Vec<String> {
        Vec::new()
    }
}

pub struct InferenceOutput {
    pub predictions: ndarray::ArrayD<f32>, // [1, 4 + num_classes, num_anchors] cxcywh in input pixels
}

/// Parse the `names` entry of a YOLO export's metadata, e.g.
/// `{0: 'glioma', 1: 'meningioma'}`, into labels indexed by class id.
///
/// Entries that do not parse are skipped; gaps are filled with the numeric id.
pub fn parse_class_names(raw: &str) -> Vec<String> {
    let body = raw.trim().trim_start_matches('{').trim_end_matches('}');

    let mut entries: Vec<(usize, String)> = Vec::new();
    let mut rest = body;
    while let Some((key, value)) = rest.split_once(':') {
        let Ok(id) = key.trim().trim_start_matches(',').trim().parse::<usize>() else {
            break;
        };

        let value = value.trim_start();
        let Some(quote) = value.chars().next().filter(|c| *c == '\'' || *c == '"') else {
            break;
        };
        let Some((name, tail)) = value[1..].split_once(quote) else {
            break;
        };

        entries.push((id, name.to_string()));
        rest = tail;
    }

    let len = entries.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
    let mut names: Vec<String> = (0..len).map(|id| id.to_string()).collect();
    for (id, name) in entries {
        names[id] = name;
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yolo_names() {
        let names = parse_class_names("{0: 'glioma', 1: 'meningioma', 2: 'pituitary'}");
        assert_eq!(names, vec!["glioma", "meningioma", "pituitary"]);
    }

    #[test]
    fn test_parse_keeps_commas_and_colons_inside_quotes() {
        let names = parse_class_names(r#"{0: "tumor, large", 1: 'a:b'}"#);
        assert_eq!(names, vec!["tumor, large", "a:b"]);
    }

    #[test]
    fn test_parse_orders_by_id_and_fills_gaps() {
        let names = parse_class_names("{2: 'c', 0: 'a'}");
        assert_eq!(names, vec!["a", "1", "c"]);
    }

    #[test]
    fn test_parse_garbage_yields_no_names() {
        assert!(parse_class_names("").is_empty());
        assert!(parse_class_names("{}").is_empty());
        assert!(parse_class_names("not a dict").is_empty());
    }
}
