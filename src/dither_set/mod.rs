use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
};

use itertools::Itertools;

use crate::{
    CobraImages, Dither, DitherConfig, DitherError, PfsConfig, Raster, Result, VisitUpdateError,
};

mod images;
mod load;
pub use images::{ImageConfig, ImageConfigUpdate};
pub use load::{LoadOptions, LoadReport, SpectrographFailure, VisitOutcome};

/// Default spectrograph modules of a dither set
pub const DEFAULT_SPECTROGRAPHS: [u8; 2] = [1, 3];

/// A named set of dithered visits
///
/// The set keeps 3 tiers of cached data:
///  - the raw dithers, appended to as visits are loaded,
///  - the dithers, a frozen copy of the raw dithers truncated to the number of visits,
///  - the cobra images built from the frozen dithers.
pub struct DitherSet<L: Raster> {
    config: Rc<DitherConfig<L>>,
    name: String,
    visits: Vec<u32>,
    comment: Option<String>,
    use_guide_offsets: bool,
    spectrographs: Vec<u8>,
    raw_dithers: Vec<Dither<L::Payload>>,
    dithers: Vec<Dither<L::Payload>>,
    image_cfg: ImageConfig,
    images: Option<CobraImages>,
    image_dithers: Vec<u32>,
    extinction: Option<BTreeMap<u32, f64>>,
}
impl<L: Raster> DitherSet<L> {
    pub fn new<S, V>(
        config: Rc<DitherConfig<L>>,
        name: S,
        visits: V,
        comment: Option<String>,
        spectrographs: &[u8],
    ) -> Self
    where
        S: Into<String>,
        V: IntoIterator<Item = u32>,
    {
        Self {
            config,
            name: name.into(),
            visits: visits.into_iter().collect(),
            comment,
            use_guide_offsets: false,
            spectrographs: spectrographs.to_vec(),
            raw_dithers: vec![],
            dithers: vec![],
            image_cfg: ImageConfig::default(),
            images: None,
            image_dithers: vec![],
            extinction: None,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
    pub fn visits(&self) -> &[u32] {
        &self.visits
    }
    pub fn spectrographs(&self) -> &[u8] {
        &self.spectrographs
    }
    pub fn config(&self) -> &Rc<DitherConfig<L>> {
        &self.config
    }
    pub fn use_guide_offsets(&self) -> bool {
        self.use_guide_offsets
    }
    /// Adds the guider offsets to the dither offsets when loading visits
    pub fn set_use_guide_offsets(&mut self, use_guide_offsets: bool) {
        self.use_guide_offsets = use_guide_offsets;
    }
    /// Raster data of the loaded visits, possibly still growing
    pub fn raw_dithers(&self) -> &[Dither<L::Payload>] {
        &self.raw_dithers
    }
    /// Frozen copy of the raw dithers
    pub fn dithers(&self) -> &[Dither<L::Payload>] {
        &self.dithers
    }
    /// Fiber configuration of the first frozen dither
    pub fn pfs_config(&self) -> Option<&PfsConfig> {
        self.dithers.first().and_then(|d| d.pfs_config.as_ref())
    }

    /// Replaces the raw dithers, discarding the frozen dithers and the images
    pub fn set_raw_dithers(&mut self, raw_dithers: Vec<Dither<L::Payload>>) {
        self.raw_dithers = raw_dithers;
        self.dithers.clear();
        self.images = None;
    }
    /// Extends the visits of the set
    ///
    /// The new visits must start with the current ones.
    /// The cached dithers are kept.
    pub fn update_visits(&mut self, visits: Vec<u32>) -> Result<()> {
        if visits.len() < self.visits.len() {
            return Err(VisitUpdateError::FewerVisits {
                current: self.visits.len(),
                new: visits.len(),
            }
            .into());
        }
        if !visits.starts_with(&self.visits) {
            return Err(VisitUpdateError::NotAnExtension(self.visits.clone()).into());
        }
        self.visits = visits;
        Ok(())
    }
    /// Discards all the raw and derived data
    pub fn flush(&mut self) {
        self.set_raw_dithers(vec![]);
    }
    /// Copies the raw dithers, up to the number of visits, into the dithers
    ///
    /// The cobra images are discarded
    pub fn freeze(&mut self) -> &[Dither<L::Payload>] {
        self.dithers = self
            .raw_dithers
            .iter()
            .take(self.visits.len())
            .cloned()
            .collect();
        self.images = None;
        &self.dithers
    }
    /// Returns `{name}_{visit0}[_{suffix}]`, joined to `dir` if any
    pub fn full_name<P: AsRef<Path>>(&self, suffix: &str, dir: Option<P>) -> Result<PathBuf> {
        let visit0 = self
            .visits
            .first()
            .ok_or_else(|| DitherError::NoVisits(self.name.clone()))?;
        let name = if suffix.is_empty() {
            format!("{}_{}", self.name, visit0)
        } else {
            format!("{}_{}_{}", self.name, visit0, suffix)
        };
        Ok(match dir {
            Some(dir) => dir.as_ref().join(name),
            None => PathBuf::from(name),
        })
    }
}
impl<L: Raster> fmt::Display for DitherSet<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}/{} dithers",
            self.name,
            self.visits.iter().join(","),
            self.dithers.len(),
            self.visits.len()
        )?;
        if let Some(comment) = &self.comment {
            write!(f, ": {comment}")?;
        }
        Ok(())
    }
}
