use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    ReferenceImage, ReferenceImageError, ReferenceImageId, ReferenceImageSet, StoryboardError,
};
use crate::infra::reference_file::load_reference_image;

use super::StoryboardUpdate;
use super::background_jobs::{BackgroundJobs, JobOutcome};

pub trait ReferenceImageLoader: Send + Sync {
    fn load_reference(&self, path: &Path) -> Result<ReferenceImage, ReferenceImageError>;
}

#[derive(Debug, Default)]
pub struct FileReferenceImageLoader;

impl ReferenceImageLoader for FileReferenceImageLoader {
    fn load_reference(&self, path: &Path) -> Result<ReferenceImage, ReferenceImageError> {
        load_reference_image(path)
    }
}

/// Decodes selected files in the background and keeps the capped set of
/// reference images.
pub(crate) struct ReferenceIntake {
    loader: Arc<dyn ReferenceImageLoader>,
    images: ReferenceImageSet,
}

impl ReferenceIntake {
    pub fn new(loader: Arc<dyn ReferenceImageLoader>) -> Self {
        Self {
            loader,
            images: ReferenceImageSet::new(),
        }
    }

    pub fn images(&self) -> &[ReferenceImage] {
        self.images.as_slice()
    }

    /// Starts one independent decode per path. Completion order is whatever
    /// order the decodes finish in.
    pub fn begin(
        &self,
        jobs: &BackgroundJobs,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Result<usize, StoryboardError> {
        let mut started = 0;
        for path in paths {
            let loader = Arc::clone(&self.loader);
            jobs.spawn("reference-decode", move || {
                let result = loader.load_reference(&path);
                JobOutcome::ReferenceDecoded { path, result }
            })?;
            started += 1;
        }
        Ok(started)
    }

    pub fn apply(
        &mut self,
        path: PathBuf,
        result: Result<ReferenceImage, ReferenceImageError>,
    ) -> Vec<StoryboardUpdate> {
        let image = match result {
            Ok(image) => image,
            Err(error) => {
                warn!(path = %path.display(), %error, "reference image rejected");
                return vec![StoryboardUpdate::ReferenceRejected { path, error }];
            }
        };

        let reference_id = image.id;
        let dropped = self.images.push(image);
        let mut updates = Vec::new();
        if !dropped.contains(&reference_id) {
            info!(path = %path.display(), reference = %reference_id, "reference image added");
            updates.push(StoryboardUpdate::ReferenceAdded { reference_id });
        }
        for reference_id in dropped {
            info!(reference = %reference_id, "reference image dropped, limit reached");
            updates.push(StoryboardUpdate::ReferenceDropped { reference_id });
        }
        updates
    }

    pub fn remove(&mut self, id: ReferenceImageId) -> bool {
        self.images.remove(id)
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}
