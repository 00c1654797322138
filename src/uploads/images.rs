use image::{codecs::webp::WebPEncoder, imageops::FilterType, DynamicImage};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::{UploadError, UploadedFile};
use crate::config::UploadConfig;
use crate::database::models::ImageVariant;

/// Public URL prefix the upload root is served under
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImage {
    pub original_name: String,
    pub filename: String,
    pub mimetype: String,
    pub size: usize,
    pub paths: ImageVariant,
}

impl ProcessedImage {
    /// The path a product shows for this image: the medium WebP, else the original
    pub fn display_path(&self) -> String {
        if self.paths.medium_webp.is_empty() {
            self.paths.original.clone()
        } else {
            self.paths.medium_webp.clone()
        }
    }
}

/// Writes the original upload and its WebP variants under `root/images`
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    root: PathBuf,
    sizes: [(&'static str, u32); 2],
}

impl ImageProcessor {
    pub fn new(root: impl Into<PathBuf>, thumbnail_size: u32, medium_size: u32) -> Self {
        Self {
            root: root.into(),
            sizes: [("thumbnail", thumbnail_size), ("medium", medium_size)],
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.root_dir, config.thumbnail_size, config.medium_size)
    }

    pub fn ensure_directories(&self) -> Result<(), UploadError> {
        for dir in ["original", "webp", "thumbnail", "medium"] {
            fs::create_dir_all(self.root.join("images").join(dir))?;
        }
        Ok(())
    }

    /// Decode one upload and write the original, a full-size WebP, and one WebP per box size
    pub fn process(&self, file: &UploadedFile) -> Result<ProcessedImage, UploadError> {
        let img = image::load_from_memory(&file.data)?;
        let stem = Path::new(&file.stored_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&file.stored_name)
            .to_string();

        fs::write(self.root.join("images/original").join(&file.stored_name), &file.data)?;
        let mut paths = ImageVariant {
            original: format!("{}/images/original/{}", PUBLIC_PREFIX, file.stored_name),
            ..Default::default()
        };

        let webp_name = format!("{}.webp", stem);
        write_webp(&img, &self.root.join("images/webp").join(&webp_name))?;
        paths.webp = format!("{}/images/webp/{}", PUBLIC_PREFIX, webp_name);

        for (size, max) in self.sizes {
            let (width, height) = fit_inside(img.width(), img.height(), max, max);
            let resized = if (width, height) == (img.width(), img.height()) {
                img.clone()
            } else {
                img.resize_exact(width, height, FilterType::Lanczos3)
            };

            let name = format!("{}-{}.webp", stem, size);
            write_webp(&resized, &self.root.join("images").join(size).join(&name))?;
            let public = format!("{}/images/{}/{}", PUBLIC_PREFIX, size, name);
            match size {
                "thumbnail" => paths.thumbnail_webp = public,
                _ => paths.medium_webp = public,
            }
        }

        Ok(ProcessedImage {
            original_name: file.original_name.clone(),
            filename: stem,
            mimetype: file.content_type.clone(),
            size: file.data.len(),
            paths,
        })
    }

    /// Process every upload on the blocking pool
    pub async fn process_all(self, files: Vec<UploadedFile>) -> Result<Vec<ProcessedImage>, UploadError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let processed = tokio::task::spawn_blocking(move || {
            self.ensure_directories()?;
            let mut done = Vec::with_capacity(files.len());
            for file in &files {
                match self.process(file) {
                    Ok(image) => done.push(image),
                    Err(e) => {
                        self.discard(&done);
                        return Err(e);
                    }
                }
            }
            Ok(done)
        })
        .await
        .map_err(|e| UploadError::Task(e.to_string()))??;

        tracing::info!("Processed {} uploaded images", processed.len());
        Ok(processed)
    }

    /// Remove every file written for `images`; missing files are ignored
    pub fn discard(&self, images: &[ProcessedImage]) {
        for image in images {
            let paths = &image.paths;
            for public in [&paths.original, &paths.webp, &paths.thumbnail_webp, &paths.medium_webp] {
                let Some(relative) = public.strip_prefix(PUBLIC_PREFIX).map(|p| p.trim_start_matches('/')) else {
                    continue;
                };
                if relative.is_empty() {
                    continue;
                }
                match fs::remove_file(self.root.join(relative)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!("Could not remove upload {}: {}", public, e),
                }
            }
        }
        if !images.is_empty() {
            tracing::info!("Discarded {} uploaded images", images.len());
        }
    }
}

fn write_webp(img: &DynamicImage, path: &Path) -> Result<(), UploadError> {
    let writer = BufWriter::new(File::create(path)?);
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    rgba.write_with_encoder(WebPEncoder::new_lossless(writer))?;
    Ok(())
}

/// Largest size with the same aspect ratio that fits in the box; never enlarges
pub fn fit_inside(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = f64::min(max_width as f64 / width as f64, max_height as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn upload(name: &str, data: Vec<u8>) -> UploadedFile {
        UploadedFile {
            original_name: name.to_string(),
            stored_name: format!("1700000000000-{}", name),
            content_type: "image/png".to_string(),
            data,
        }
    }

    fn dimensions(root: &Path, public: &str) -> (u32, u32) {
        let relative = public.trim_start_matches("/uploads/");
        let img = image::open(root.join(relative)).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn fit_inside_keeps_aspect_ratio() {
        assert_eq!(fit_inside(1200, 800, 150, 150), (150, 100));
        assert_eq!(fit_inside(800, 1200, 600, 600), (400, 600));
        assert_eq!(fit_inside(100, 50, 150, 150), (100, 50));
        assert_eq!(fit_inside(10000, 1, 150, 150), (150, 1));
    }

    #[test]
    fn writes_every_variant() {
        let dir = tempfile::tempdir().unwrap();
        let processor = ImageProcessor::new(dir.path(), 150, 600);
        processor.ensure_directories().unwrap();

        let processed = processor.process(&upload("cake.png", png(1200, 800))).unwrap();

        assert_eq!(processed.filename, "1700000000000-cake");
        assert_eq!(processed.paths.original, "/uploads/images/original/1700000000000-cake.png");
        assert_eq!(processed.paths.webp, "/uploads/images/webp/1700000000000-cake.webp");
        assert_eq!(
            processed.paths.thumbnail_webp,
            "/uploads/images/thumbnail/1700000000000-cake-thumbnail.webp"
        );
        assert_eq!(processed.paths.medium_webp, "/uploads/images/medium/1700000000000-cake-medium.webp");
        assert_eq!(processed.display_path(), processed.paths.medium_webp);

        assert_eq!(dimensions(dir.path(), &processed.paths.webp), (1200, 800));
        assert_eq!(dimensions(dir.path(), &processed.paths.thumbnail_webp), (150, 100));
        assert_eq!(dimensions(dir.path(), &processed.paths.medium_webp), (600, 400));
        assert!(dir.path().join("images/original/1700000000000-cake.png").exists());
    }

    #[test]
    fn small_images_are_not_enlarged() {
        let dir = tempfile::tempdir().unwrap();
        let processor = ImageProcessor::new(dir.path(), 150, 600);
        processor.ensure_directories().unwrap();

        let processed = processor.process(&upload("icon.png", png(100, 50))).unwrap();
        assert_eq!(dimensions(dir.path(), &processed.paths.thumbnail_webp), (100, 50));
        assert_eq!(dimensions(dir.path(), &processed.paths.medium_webp), (100, 50));
    }

    #[test]
    fn undecodable_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let processor = ImageProcessor::new(dir.path(), 150, 600);
        processor.ensure_directories().unwrap();

        let err = processor.process(&upload("fake.png", b"not an image".to_vec())).unwrap_err();
        assert!(matches!(err, UploadError::Image(_)));
        assert!(!dir.path().join("images/original/1700000000000-fake.png").exists());
    }

    #[test]
    fn discard_removes_every_variant() {
        let dir = tempfile::tempdir().unwrap();
        let processor = ImageProcessor::new(dir.path(), 150, 600);
        processor.ensure_directories().unwrap();

        let processed = processor.process(&upload("tart.png", png(300, 200))).unwrap();
        processor.discard(std::slice::from_ref(&processed));

        let paths = &processed.paths;
        for public in [&paths.original, &paths.webp, &paths.thumbnail_webp, &paths.medium_webp] {
            assert!(!dir.path().join(public.trim_start_matches("/uploads/")).exists(), "{}", public);
        }
        // A second pass finds nothing to remove
        processor.discard(&[processed]);
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let processor = ImageProcessor::new(dir.path(), 150, 600);

        let files = vec![upload("good.png", png(300, 300)), upload("bad.png", b"not an image".to_vec())];
        let err = processor.process_all(files).await.unwrap_err();
        assert!(matches!(err, UploadError::Image(_)));
        assert!(!dir.path().join("images/original/1700000000000-good.png").exists());
        assert!(!dir.path().join("images/webp/1700000000000-good.webp").exists());
    }

    #[tokio::test]
    async fn process_all_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let processor = ImageProcessor::new(dir.path().join("uploads"), 150, 600);
        let processed = processor.process_all(vec![upload("a.png", png(300, 300))]).await.unwrap();
        assert_eq!(processed.len(), 1);
        assert!(dir.path().join("uploads/images/medium").is_dir());
    }
}
