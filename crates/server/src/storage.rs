//! Filesystem layout for uploads and prediction outputs.
//!
//! ```text
//! <static_root>/
//!   uploads/<uuid>.<ext>
//!   outputs/<uuid>.<ext>/<uuid>.jpg
//! ```

use anyhow::Context;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const UPLOADS_DIR: &str = "uploads";
pub const OUTPUTS_DIR: &str = "outputs";
/// URL prefix under which the static root is served.
pub const STATIC_URL_PREFIX: &str = "static";
/// Extension of the images the detector writes.
pub const OUTPUT_EXTENSION: &str = "jpg";

#[derive(Debug, Clone)]
pub struct StoragePaths {
    static_root: PathBuf,
    uploads: PathBuf,
    outputs: PathBuf,
}

impl StoragePaths {
    pub fn new(static_root: impl Into<PathBuf>) -> Self {
        let static_root = static_root.into();
        Self {
            uploads: static_root.join(UPLOADS_DIR),
            outputs: static_root.join(OUTPUTS_DIR),
            static_root,
        }
    }

    /// Create the uploads and outputs directories if absent.
    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        for dir in [&self.uploads, &self.outputs] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs
    }

    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.uploads.join(filename)
    }

    pub fn output_dir(&self, namespace: &str) -> PathBuf {
        self.outputs.join(namespace)
    }
}

/// Extension of the last path component of a client-supplied filename.
///
/// Names without a dot, dot-files such as `.bashrc`, trailing dots and
/// extensions with anything but ASCII alphanumerics yield `None`.
pub fn file_extension(original: &str) -> Option<&str> {
    let name = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (stem, ext) = name.rsplit_once('.')?;

    if stem.chars().all(|c| c == '.') {
        return None;
    }
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// Fresh storage name for an upload: a random UUID keeping the original
/// extension.
pub fn unique_filename(original: &str) -> String {
    let id = Uuid::new_v4();
    match file_extension(original) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Lexicographically first `*.jpg` file in `dir`, if any. A missing
/// directory counts as empty.
pub async fn first_output_image(dir: &Path) -> anyhow::Result<Option<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to list {}", dir.display()));
        }
    };

    let mut first: Option<String> = None;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') || !has_output_extension(&name) {
            continue;
        }
        if first.as_ref().is_none_or(|current| name < *current) {
            first = Some(name);
        }
    }

    Ok(first)
}

fn has_output_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(OUTPUT_EXTENSION))
}

/// Relative URL of an output image, as served under [`STATIC_URL_PREFIX`].
pub fn image_url(namespace: &str, file_name: &str) -> String {
    format!("{STATIC_URL_PREFIX}/{OUTPUTS_DIR}/{namespace}/{file_name}")
}
