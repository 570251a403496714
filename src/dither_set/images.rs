use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::DitherSet;
use crate::{CobraImageRequest, CobraImages, DitherError, Raster, Result};

/// Cobra images construction options
///
/// Any change of the options forces the images to be rebuilt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub side: Option<f64>,
    pub pixel_scale: Option<f64>,
    /// Cobra aperture radius
    pub radius: Option<f64>,
    pub use_pf_imm: bool,
    pub icrosstalk: bool,
    pub correct_extinction: bool,
}
impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            side: None,
            pixel_scale: None,
            radius: None,
            use_pf_imm: true,
            icrosstalk: false,
            correct_extinction: true,
        }
    }
}
impl ImageConfig {
    /// Returns a copy of the options with the update applied
    pub fn merge(&self, update: &ImageConfigUpdate) -> Self {
        Self {
            side: update.side.or(self.side),
            pixel_scale: update.pixel_scale.or(self.pixel_scale),
            radius: update.radius.or(self.radius),
            use_pf_imm: update.use_pf_imm.unwrap_or(self.use_pf_imm),
            icrosstalk: update.icrosstalk.unwrap_or(self.icrosstalk),
            correct_extinction: update.correct_extinction.unwrap_or(self.correct_extinction),
        }
    }
}

/// Partial update of the [ImageConfig], fields left to `None` are unchanged
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfigUpdate {
    pub side: Option<f64>,
    pub pixel_scale: Option<f64>,
    pub radius: Option<f64>,
    pub use_pf_imm: Option<bool>,
    pub icrosstalk: Option<bool>,
    pub correct_extinction: Option<bool>,
}
impl ImageConfigUpdate {
    pub fn side(self, side: f64) -> Self {
        Self {
            side: Some(side),
            ..self
        }
    }
    pub fn pixel_scale(self, pixel_scale: f64) -> Self {
        Self {
            pixel_scale: Some(pixel_scale),
            ..self
        }
    }
    pub fn radius(self, radius: f64) -> Self {
        Self {
            radius: Some(radius),
            ..self
        }
    }
    pub fn use_pf_imm(self, use_pf_imm: bool) -> Self {
        Self {
            use_pf_imm: Some(use_pf_imm),
            ..self
        }
    }
    pub fn icrosstalk(self, icrosstalk: bool) -> Self {
        Self {
            icrosstalk: Some(icrosstalk),
            ..self
        }
    }
    pub fn correct_extinction(self, correct_extinction: bool) -> Self {
        Self {
            correct_extinction: Some(correct_extinction),
            ..self
        }
    }
}

impl<L: Raster> DitherSet<L> {
    pub fn image_cfg(&self) -> &ImageConfig {
        &self.image_cfg
    }
    /// Visits the current cobra images were built from
    pub fn image_dithers(&self) -> &[u32] {
        &self.image_dithers
    }
    /// Extinction per visit used for the current cobra images
    pub fn extinction(&self) -> Option<&BTreeMap<u32, f64>> {
        self.extinction.as_ref()
    }
    /// Cached cobra images, if any
    pub fn images(&self) -> Option<&CobraImages> {
        self.images.as_ref()
    }
    /// Updates the cobra images options
    ///
    /// Returns `true` if the options have changed, in which case the cached
    /// images are discarded
    pub fn update_image_cfg(&mut self, update: ImageConfigUpdate) -> bool {
        let image_cfg = self.image_cfg.merge(&update);
        let changed = image_cfg != self.image_cfg;
        if changed {
            log::info!(
                "{}: forcing image rebuild: {:?} != {:?}",
                self.name,
                self.image_cfg,
                image_cfg
            );
            self.image_cfg = image_cfg;
            self.image_dithers.clear();
            self.images = None;
        }
        changed
    }
    fn dithers_changed(&self) -> bool {
        self.image_dithers.len() != self.dithers.len()
            || self
                .image_dithers
                .iter()
                .zip(&self.dithers)
                .any(|(&visit, d)| visit != d.visit)
    }
    /// Returns the cobra images of the frozen dithers
    ///
    /// The images are rebuilt if there are none, if the dithers have changed
    /// since the last build, or if `force_rebuild` is set
    pub fn cobra_images(
        &mut self,
        fiber_id: Option<i32>,
        force_rebuild: bool,
    ) -> Result<&CobraImages> {
        match self.images.take() {
            Some(images) if !force_rebuild && !self.dithers_changed() => {
                Ok(self.images.insert(images))
            }
            cached => match self.build_cobra_images(fiber_id, force_rebuild) {
                Ok(images) => Ok(self.images.insert(images)),
                Err(e) => {
                    self.images = cached;
                    Err(e)
                }
            },
        }
    }
    fn build_cobra_images(&mut self, fiber_id: Option<i32>, force_rebuild: bool) -> Result<CobraImages> {
        log::info!(
            "{}: rebuilding images (force={}): {} dithers, {} imaged",
            self.name,
            force_rebuild,
            self.dithers.len(),
            self.image_dithers.len()
        );
        let raster = self.config.raster();
        let extinction = if self.image_cfg.correct_extinction {
            let extinction = self
                .dithers
                .iter()
                .map(|d| {
                    raster
                        .estimate_extinction(self.config.db_conn(), d.visit)
                        .map(|e| (d.visit, e))
                })
                .collect::<std::result::Result<BTreeMap<u32, f64>, L::Error>>()
                .map_err(|e| DitherError::Raster(Box::new(e)))?;
            Some(extinction)
        } else {
            None
        };
        let request = CobraImageRequest::new(&self.image_cfg, fiber_id);
        let images = raster
            .make_cobra_images(&self.dithers, extinction.as_ref(), &request)
            .map_err(|e| DitherError::Raster(Box::new(e)))?;
        self.extinction = extinction;
        self.image_dithers = self.dithers.iter().map(|d| d.visit).collect();
        Ok(images)
    }
}
