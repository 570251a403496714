//! Raster library stand-in recording its calls

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use nalgebra::DMatrix;

use crate::{
    Arm, CobraImageRequest, CobraImages, DataId, Dither, DitherConfig, DitherOffset,
    DitherRequest, Extent, GuideOffset, PfsConfig, Raster,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MockPayload {
    pub spectrographs: Vec<u8>,
    pub fiber_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MakeDither {
        visit: u32,
        visit0: u32,
        data_id: DataId,
    },
    Concatenate(Vec<u8>),
    GuideOffset(u32),
    DitherRaDec(u32),
    EstimateExtinction(u32),
    MakeCobraImages {
        visits: Vec<u32>,
        extinction: bool,
        fiber_ids: Option<Vec<i32>>,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

#[derive(Default)]
pub struct MockRaster {
    positions: BTreeMap<u32, (f64, f64)>,
    failing_dithers: BTreeSet<(u32, u8)>,
    guide_offsets: BTreeMap<u32, GuideOffset>,
    failing_guide_offsets: BTreeSet<u32>,
    failing_concatenations: BTreeSet<u32>,
    dither_offsets: BTreeMap<u32, DitherOffset>,
    failing_images: bool,
    calls: RefCell<Vec<Call>>,
}
impl MockRaster {
    pub fn position(mut self, visit: u32, ra: f64, dec: f64) -> Self {
        self.positions.insert(visit, (ra, dec));
        self
    }
    pub fn failing_dither(mut self, visit: u32, spectrograph: u8) -> Self {
        self.failing_dithers.insert((visit, spectrograph));
        self
    }
    pub fn guide_offset(mut self, visit: u32, dra: f64, ddec: f64) -> Self {
        self.guide_offsets.insert(visit, GuideOffset { dra, ddec });
        self
    }
    pub fn failing_guide_offset(mut self, visit: u32) -> Self {
        self.failing_guide_offsets.insert(visit);
        self
    }
    pub fn failing_concatenation(mut self, visit: u32) -> Self {
        self.failing_concatenations.insert(visit);
        self
    }
    pub fn dither_offset(mut self, visit: u32, dither_ra: f64, dither_dec: f64) -> Self {
        self.dither_offsets.insert(
            visit,
            DitherOffset {
                dither_ra,
                dither_dec,
            },
        );
        self
    }
    pub fn failing_images(self) -> Self {
        Self {
            failing_images: true,
            ..self
        }
    }
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

pub fn dither(visit: u32) -> Dither<MockPayload> {
    Dither::new(
        visit,
        150.0,
        2.0,
        MockPayload {
            spectrographs: vec![1, 3],
            fiber_ids: vec![1001, 3001],
        },
    )
    .pfs_config(PfsConfig {
        pfs_design_id: 0x5a1a,
        visit,
        ra: 150.0,
        dec: 2.0,
        pos_ang: 0.0,
    })
}

pub fn config(raster: MockRaster) -> Rc<DitherConfig<MockRaster>> {
    DitherConfig::new(raster, (), (), ())
        .fiber_traces(Arm::R, 1, "r1".to_string())
        .fiber_traces(Arm::R, 3, "r3".to_string())
        .wavelength_range(650.0, 950.0)
        .into_shared()
}

impl Raster for MockRaster {
    type Butler = ();
    type DbConn = ();
    type FiberTraces = String;
    type Camera = ();
    type Payload = MockPayload;
    type Error = MockError;

    fn make_dither(
        &self,
        _butler: &(),
        data_id: &DataId,
        fiber_traces: &String,
        _camera: &(),
        request: DitherRequest,
    ) -> Result<Dither<MockPayload>, MockError> {
        let visit = data_id.visit.unwrap_or_default();
        let spectrograph = data_id.spectrograph.unwrap_or_default();
        self.record(Call::MakeDither {
            visit,
            visit0: request.visit0,
            data_id: data_id.clone(),
        });
        if self.failing_dithers.contains(&(visit, spectrograph)) {
            return Err(MockError(format!("no {fiber_traces} pfsArm for visit {visit}")));
        }
        let (ra, dec) = self
            .positions
            .get(&visit)
            .copied()
            .unwrap_or((150.0, 2.0));
        Ok(Dither::new(
            visit,
            ra,
            dec,
            MockPayload {
                spectrographs: vec![spectrograph],
                fiber_ids: vec![spectrograph as i32 * 1000 + 1],
            },
        )
        .pfs_config(PfsConfig {
            pfs_design_id: 0x5a1a,
            visit,
            ra,
            dec,
            pos_ang: 0.0,
        }))
    }

    fn concatenate_dithers(
        &self,
        _butler: &(),
        dithers: Vec<Dither<MockPayload>>,
    ) -> Result<Dither<MockPayload>, MockError> {
        let mut dithers = dithers.into_iter();
        let mut merged = dithers
            .next()
            .ok_or_else(|| MockError("nothing to concatenate".to_string()))?;
        if self.failing_concatenations.contains(&merged.visit) {
            return Err(MockError(format!(
                "failed to concatenate dithers of visit {}",
                merged.visit
            )));
        }
        for d in dithers {
            merged.payload.spectrographs.extend(d.payload.spectrographs);
            merged.payload.fiber_ids.extend(d.payload.fiber_ids);
        }
        self.record(Call::Concatenate(merged.payload.spectrographs.clone()));
        Ok(merged)
    }

    fn guide_offset(&self, _db_conn: &(), visit: u32) -> Result<GuideOffset, MockError> {
        self.record(Call::GuideOffset(visit));
        if self.failing_guide_offsets.contains(&visit) {
            return Err(MockError(format!("no guide offset for visit {visit}")));
        }
        Ok(self.guide_offsets.get(&visit).copied().unwrap_or_default())
    }

    fn dither_ra_dec(&self, _db_conn: &(), visit: u32) -> Result<DitherOffset, MockError> {
        self.record(Call::DitherRaDec(visit));
        Ok(self.dither_offsets.get(&visit).copied().unwrap_or_default())
    }

    fn estimate_extinction(&self, _db_conn: &(), visit: u32) -> Result<f64, MockError> {
        self.record(Call::EstimateExtinction(visit));
        Ok(1.0 + visit as f64 * 1e-4)
    }

    fn make_cobra_images(
        &self,
        dithers: &[Dither<MockPayload>],
        extinction: Option<&BTreeMap<u32, f64>>,
        request: &CobraImageRequest,
    ) -> Result<CobraImages, MockError> {
        self.record(Call::MakeCobraImages {
            visits: dithers.iter().map(|d| d.visit).collect(),
            extinction: extinction.is_some(),
            fiber_ids: request.fiber_ids.clone(),
        });
        if self.failing_images {
            return Err(MockError("failed to make cobra images".to_string()));
        }
        let images = dithers
            .iter()
            .flat_map(|d| d.payload.fiber_ids.iter().copied())
            .filter(|id| {
                request
                    .fiber_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(id))
            })
            .map(|id| (id, DMatrix::zeros(4, 4)))
            .collect();
        Ok(CobraImages {
            images,
            extent: Extent {
                x0: -1.0,
                x1: 1.0,
                y0: -1.0,
                y1: 1.0,
            },
            visit_image: DMatrix::from_element(4, 4, dithers.len() as f64),
        })
    }
}
