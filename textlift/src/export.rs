use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::media::ImageAsset;

const EXTRACTED_SUFFIX: &str = "_extracted.txt";
const FALLBACK_BASE: &str = "image";

/// Name of the text file exported for `source_name`.
///
/// Only the last extension is dropped, so `archive.tar.gz` becomes
/// `archive.tar_extracted.txt`. Directory components are ignored.
pub fn extracted_file_name(source_name: &str) -> String {
    let base = Path::new(source_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(FALLBACK_BASE);
    format!("{base}{EXTRACTED_SUFFIX}")
}

/// Writes the text recognized from `image` into `dir`, creating `dir` if
/// needed. The file is named after the image's original name; unnamed images
/// export as `image_extracted.txt`.
pub async fn write_extracted(dir: &Path, image: &ImageAsset, text: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(extracted_file_name(image.name().unwrap_or_default()));
    tokio::fs::write(&path, text).await?;
    info!(path = %path.display(), bytes = text.len(), "Extracted text written");
    Ok(path)
}
