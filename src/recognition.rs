use std::sync::Arc;

use anyhow::Result;
use image::DynamicImage;

use crate::models::{DiagramCandidate, RecognizedPosition};

/// A position classifier. Calls are CPU/GPU bound, so the controller runs them on the
/// blocking pool.
///
/// Backends need not be idempotent; the controller caches by candidate id.
pub trait RecognitionBackend: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, image: &DynamicImage) -> Result<RecognizedPosition>;
}

/// Renders the pixels of a candidate. Supplied by the rendering/discovery layer so the
/// controller never touches document bytes.
pub type ImageGetter = Arc<dyn Fn(&DiagramCandidate) -> Result<DynamicImage> + Send + Sync>;
