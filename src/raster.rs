//! Interface to the raster imaging library
//!
//! The dither sets never build rasters, query the observatory database or
//! read the butler repository themselves: everything goes through an
//! implementation of the [Raster] trait.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{DataId, ImageConfig};

/// Fiber configuration header of a visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfsConfig {
    pub pfs_design_id: u64,
    pub visit: u32,
    /// Boresight right ascension [deg]
    pub ra: f64,
    /// Boresight declination [deg]
    pub dec: f64,
    /// Position angle [deg]
    pub pos_ang: f64,
}

/// Guider offset of a visit [arcsec]
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideOffset {
    pub dra: f64,
    pub ddec: f64,
}

/// Commanded dither offset of a visit [arcsec]
///
/// The offset along right ascension is not corrected for the declination
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DitherOffset {
    pub dither_ra: f64,
    pub dither_dec: f64,
}

/// Raster data of a visit
///
/// The payload `P` is whatever the raster library makes of the spectra of the
/// visit; its [Clone] implementation must be a deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Dither<P> {
    pub visit: u32,
    /// Right ascension [deg]
    pub ra: f64,
    /// Declination [deg]
    pub dec: f64,
    pub guide_offset: Option<GuideOffset>,
    pub dither_offset: Option<DitherOffset>,
    pub pfs_config: Option<PfsConfig>,
    pub payload: P,
}
impl<P> Dither<P> {
    pub fn new(visit: u32, ra: f64, dec: f64, payload: P) -> Self {
        Self {
            visit,
            ra,
            dec,
            guide_offset: None,
            dither_offset: None,
            pfs_config: None,
            payload,
        }
    }
    pub fn pfs_config(self, pfs_config: PfsConfig) -> Self {
        Self {
            pfs_config: Some(pfs_config),
            ..self
        }
    }
    /// Guider offset along right ascension [arcsec]
    pub fn dra(&self) -> Option<f64> {
        self.guide_offset.map(|g| g.dra)
    }
    /// Guider offset along declination [arcsec]
    pub fn ddec(&self) -> Option<f64> {
        self.guide_offset.map(|g| g.ddec)
    }
}

/// Sky extent of the cobra images `[x0,x1,y0,y1]`
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

/// Cobra images of a dither set
#[derive(Debug, Clone, PartialEq)]
pub struct CobraImages {
    /// Images per fiber id
    pub images: BTreeMap<i32, DMatrix<f64>>,
    pub extent: Extent,
    /// Index of the visit contributing to each pixel
    pub visit_image: DMatrix<f64>,
}

/// Cobra images construction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CobraImageRequest {
    pub side: Option<f64>,
    pub pixel_scale: Option<f64>,
    pub radius: Option<f64>,
    pub use_pf_imm: bool,
    pub fiber_ids: Option<Vec<i32>>,
    pub icrosstalk: bool,
    pub set_unimaged_pixels_to_nan: bool,
}
impl CobraImageRequest {
    pub fn new(cfg: &ImageConfig, fiber_id: Option<i32>) -> Self {
        Self {
            side: cfg.side,
            pixel_scale: cfg.pixel_scale,
            radius: cfg.radius,
            use_pf_imm: cfg.use_pf_imm,
            fiber_ids: fiber_id.map(|id| vec![id]),
            icrosstalk: cfg.icrosstalk,
            set_unimaged_pixels_to_nan: true,
        }
    }
}

/// Arguments of [Raster::make_dither] besides the handles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DitherRequest {
    pub lmin: f64,
    pub lmax: f64,
    /// The first visit of the set, common reference frame of all the dithers
    pub visit0: u32,
    pub use_pfs_arm: bool,
}

/// Raster imaging library
pub trait Raster {
    type Butler;
    type DbConn;
    type FiberTraces;
    type Camera;
    type Payload: Clone;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds the raster of one spectrograph for one visit
    fn make_dither(
        &self,
        butler: &Self::Butler,
        data_id: &DataId,
        fiber_traces: &Self::FiberTraces,
        camera: &Self::Camera,
        request: DitherRequest,
    ) -> Result<Dither<Self::Payload>, Self::Error>;
    /// Merges the rasters of several spectrographs for the same visit
    fn concatenate_dithers(
        &self,
        butler: &Self::Butler,
        dithers: Vec<Dither<Self::Payload>>,
    ) -> Result<Dither<Self::Payload>, Self::Error>;
    fn guide_offset(&self, db_conn: &Self::DbConn, visit: u32) -> Result<GuideOffset, Self::Error>;
    fn dither_ra_dec(
        &self,
        db_conn: &Self::DbConn,
        visit: u32,
    ) -> Result<DitherOffset, Self::Error>;
    /// Returns the extinction of a visit
    fn estimate_extinction(&self, db_conn: &Self::DbConn, visit: u32) -> Result<f64, Self::Error>;
    fn make_cobra_images(
        &self,
        dithers: &[Dither<Self::Payload>],
        extinction: Option<&BTreeMap<u32, f64>>,
        request: &CobraImageRequest,
    ) -> Result<CobraImages, Self::Error>;
}
