/*!
# PFS dither sets

Bookkeeping of the sets of dithered visits of the Prime Focus Spectrograph
and of the cobra images built from them.

A [DitherSetCollection] holds named [DitherSet]s sharing the same
[DitherConfig]. Each dither set caches:
 - the raw dithers, the raster data of the visits loaded with [DitherSet::load_available],
 - the dithers, a copy of the raw dithers frozen with [DitherSet::freeze],
 - the cobra images built from the dithers with [DitherSet::cobra_images].

Rasters, guider and dither offsets, extinction and images all come from an
implementation of the [Raster] trait.

## Usage

```rust,ignore
use pfs_dithers::{DitherConfig, DitherSetCollection, ImageConfigUpdate, LoadOptions, Arm};

let config = DitherConfig::new(raster, butler, db_conn, camera)
    .fiber_traces(Arm::R, 1, traces_r1)
    .fiber_traces(Arm::R, 3, traces_r3)
    .wavelength_range(650., 950.)
    .into_shared();
let mut dither_sets = DitherSetCollection::new(config, &pfs_dithers::DEFAULT_SPECTROGRAPHS);
let (_, ds) = dither_sets.new_dither_set("M15", 83217..=83225, None, false);
let report = ds.load_available(None, &LoadOptions::default())?;
ds.update_image_cfg(ImageConfigUpdate::default().pixel_scale(0.05).radius(1.));
let images = ds.cobra_images(None, false)?;
```
*/

pub mod catalog;
mod collection;
pub mod config;
mod dither_set;
mod error;
pub mod offsets;
mod raster;
#[cfg(test)]
mod testing;

pub use catalog::{CatalogError, DitherSetCatalog, DitherSetSpec};
pub use collection::{DitherSetCollection, Registration};
pub use config::{Arm, DataId, DitherConfig};
pub use dither_set::{
    DitherSet, ImageConfig, ImageConfigUpdate, LoadOptions, LoadReport, SpectrographFailure,
    VisitOutcome, DEFAULT_SPECTROGRAPHS,
};
pub use error::{DitherError, RasterError, Result, VisitUpdateError};
pub use raster::{
    CobraImageRequest, CobraImages, Dither, DitherOffset, DitherRequest, Extent, GuideOffset,
    PfsConfig, Raster,
};
