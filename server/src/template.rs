use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::GrayImage;
use tracing::{debug, info, warn};

/// Grayscale reference image the live contours are compared against.
///
/// Loaded once at startup (failure is fatal there). With `reload_each_frame`
/// the file is re-read on every annotation cycle so the template can be
/// swapped on disk; a failed re-read keeps the last good copy.
pub struct ReferenceTemplate {
    path: PathBuf,
    reload_each_frame: bool,
    cached: Mutex<Arc<GrayImage>>,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template {0}: {1}")]
    Read(String, image::ImageError),
    #[error("template {0} has zero width or height")]
    Empty(String),
}

impl ReferenceTemplate {
    pub fn load(path: impl Into<PathBuf>, reload_each_frame: bool) -> Result<Self, TemplateError> {
        let path = path.into();
        let image = read_gray(&path)?;
        info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            reload_each_frame,
            "reference template loaded"
        );
        Ok(Self {
            path,
            reload_each_frame,
            cached: Mutex::new(Arc::new(image)),
        })
    }

    /// A fixed in-memory template that is never re-read.
    #[cfg(test)]
    pub fn from_image(image: GrayImage) -> Self {
        Self {
            path: PathBuf::new(),
            reload_each_frame: false,
            cached: Mutex::new(Arc::new(image)),
        }
    }

    /// Template for the current cycle. Blocking when reloading is enabled.
    pub fn current(&self) -> Arc<GrayImage> {
        if self.reload_each_frame {
            match read_gray(&self.path) {
                Ok(image) => {
                    let image = Arc::new(image);
                    *self.lock() = Arc::clone(&image);
                    return image;
                }
                Err(e) => {
                    warn!(error = %e, "template reload failed, using last good copy");
                }
            }
        }
        let cached = Arc::clone(&self.lock());
        debug!(width = cached.width(), height = cached.height(), "using cached template");
        cached
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Arc<GrayImage>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_gray(path: &Path) -> Result<GrayImage, TemplateError> {
    let image = image::open(path)
        .map_err(|e| TemplateError::Read(path.display().to_string(), e))?
        .to_luma8();
    if image.width() == 0 || image.height() == 0 {
        return Err(TemplateError::Empty(path.display().to_string()));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("shape-stream-{}-{name}.png", std::process::id()))
    }

    #[test]
    fn loads_as_grayscale() {
        let path = temp_path("gray");
        image::RgbImage::from_pixel(12, 8, image::Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();
        let template = ReferenceTemplate::load(&path, false).unwrap();
        let current = template.current();
        assert_eq!(current.dimensions(), (12, 8));
        assert_eq!(current.get_pixel(0, 0), &Luma([255]));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = ReferenceTemplate::load("/nonexistent/template.png", true);
        assert!(matches!(result, Err(TemplateError::Read(..))));
    }

    #[test]
    fn reload_picks_up_replaced_file() {
        let path = temp_path("reload");
        GrayImage::from_pixel(4, 4, Luma([10])).save(&path).unwrap();
        let template = ReferenceTemplate::load(&path, true).unwrap();
        GrayImage::from_pixel(6, 6, Luma([20])).save(&path).unwrap();
        assert_eq!(template.current().dimensions(), (6, 6));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn failed_reload_keeps_last_good_copy() {
        let path = temp_path("fallback");
        GrayImage::from_pixel(5, 3, Luma([10])).save(&path).unwrap();
        let template = ReferenceTemplate::load(&path, true).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(template.current().dimensions(), (5, 3));
    }

    #[test]
    fn cached_template_ignores_disk_changes() {
        let path = temp_path("cached");
        GrayImage::from_pixel(4, 4, Luma([10])).save(&path).unwrap();
        let template = ReferenceTemplate::load(&path, false).unwrap();
        GrayImage::from_pixel(9, 9, Luma([10])).save(&path).unwrap();
        assert_eq!(template.current().dimensions(), (4, 4));
        std::fs::remove_file(&path).ok();
    }
}
