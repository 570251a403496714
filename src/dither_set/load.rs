use std::fmt;

use serde::{Deserialize, Serialize};

use super::DitherSet;
use crate::{
    config::fiber_traces_key,
    offsets::{apply_dither_offset, Anchor},
    Arm, DataId, Dither, DitherError, DitherRequest, Raster, Result,
};

/// Options of [DitherSet::load_available]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Discard all the cached dithers before loading
    pub force_reload: bool,
    /// Move the dithers according to the commanded dither offsets
    pub use_dither_offset: bool,
    pub arm: Arm,
    pub use_pfs_arm: bool,
}
impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            force_reload: false,
            use_dither_offset: true,
            arm: Arm::R,
            use_pfs_arm: true,
        }
    }
}
impl LoadOptions {
    pub fn force_reload(self) -> Self {
        Self {
            force_reload: true,
            ..self
        }
    }
    pub fn use_dither_offset(self, use_dither_offset: bool) -> Self {
        Self {
            use_dither_offset,
            ..self
        }
    }
    pub fn arm(self, arm: Arm) -> Self {
        Self { arm, ..self }
    }
    pub fn use_pfs_arm(self, use_pfs_arm: bool) -> Self {
        Self {
            use_pfs_arm,
            ..self
        }
    }
}

/// A spectrograph skipped while loading a visit
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrographFailure {
    pub spectrograph: u8,
    pub reason: String,
}
impl fmt::Display for SpectrographFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SM{}: {}", self.spectrograph, self.reason)
    }
}

/// What became of a visit in [DitherSet::load_available]
#[derive(Debug, Clone, PartialEq)]
pub enum VisitOutcome {
    /// Already in the raw dithers
    Cached { visit: u32 },
    /// A dither has been added to the raw dithers
    Loaded {
        visit: u32,
        spectrographs: Vec<u8>,
        skipped: Vec<SpectrographFailure>,
        /// Reason why the positions were not corrected
        correction_failure: Option<String>,
    },
    /// No dither could be made
    Missing {
        visit: u32,
        skipped: Vec<SpectrographFailure>,
        reason: Option<String>,
    },
}
impl VisitOutcome {
    pub fn visit(&self) -> u32 {
        match self {
            VisitOutcome::Cached { visit }
            | VisitOutcome::Loaded { visit, .. }
            | VisitOutcome::Missing { visit, .. } => *visit,
        }
    }
    pub fn is_missing(&self) -> bool {
        matches!(self, VisitOutcome::Missing { .. })
    }
}

/// Summary of [DitherSet::load_available]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub outcomes: Vec<VisitOutcome>,
    obtained: usize,
    requested: usize,
}
impl LoadReport {
    /// Number of raw dithers after loading
    pub fn obtained(&self) -> usize {
        self.obtained
    }
    /// Number of visits of the set
    pub fn requested(&self) -> usize {
        self.requested
    }
    /// Visits without dither
    pub fn missing(&self) -> Vec<u32> {
        self.outcomes
            .iter()
            .filter(|o| o.is_missing())
            .map(|o| o.visit())
            .collect()
    }
    pub fn is_complete(&self) -> bool {
        self.obtained >= self.requested
    }
}
impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Done: {}/{}", self.obtained, self.requested)
    }
}

impl<L: Raster> DitherSet<L> {
    /// Makes the dither of one visit, merging the spectrographs
    fn make_visit_dither(
        &self,
        data_id: &DataId,
        visit: u32,
        options: &LoadOptions,
    ) -> (
        std::result::Result<Dither<L::Payload>, Option<String>>,
        Vec<u8>,
        Vec<SpectrographFailure>,
    ) {
        let config = &self.config;
        let request = DitherRequest {
            lmin: config.lmin(),
            lmax: config.lmax(),
            visit0: self.visits[0],
            use_pfs_arm: options.use_pfs_arm,
        };
        let mut dithers = vec![];
        let mut spectrographs = vec![];
        let mut skipped = vec![];
        for &spectrograph in &self.spectrographs {
            let data_id = data_id.exposure(visit, options.arm, spectrograph);
            let result = match config.traces(options.arm, spectrograph) {
                Some(fiber_traces) => config
                    .raster()
                    .make_dither(
                        config.butler(),
                        &data_id,
                        fiber_traces,
                        config.camera(),
                        request,
                    )
                    .map_err(|e| e.to_string()),
                None => Err(format!(
                    "no fiber traces for {}",
                    fiber_traces_key(options.arm, spectrograph)
                )),
            };
            match result {
                Ok(dither) => {
                    log::debug!("made dither for {data_id}");
                    dithers.push(dither);
                    spectrographs.push(spectrograph);
                }
                Err(reason) => {
                    log::warn!("Failed to make dither for {data_id}: {reason}");
                    skipped.push(SpectrographFailure {
                        spectrograph,
                        reason,
                    });
                }
            }
        }
        let dither = match dithers.len() {
            0 => Err(None),
            1 => dithers.pop().ok_or(None),
            _ => config
                .raster()
                .concatenate_dithers(config.butler(), dithers)
                .map_err(|e| {
                    log::warn!("Failed to concatenate dithers of visit {visit}: {e}");
                    Some(e.to_string())
                }),
        };
        (dither, spectrographs, skipped)
    }
    /// Attaches the guider offset to the dither and moves it by its dither offset
    fn correct_position(
        &self,
        dither: &mut Dither<L::Payload>,
        anchor: &mut Option<Anchor>,
        use_dither_offset: bool,
    ) -> std::result::Result<(), L::Error> {
        let raster = self.config.raster();
        let db_conn = self.config.db_conn();
        dither.guide_offset = Some(raster.guide_offset(db_conn, dither.visit)?);
        if use_dither_offset {
            let anchor = *anchor.get_or_insert_with(|| Anchor::from(&*dither));
            let offset = raster.dither_ra_dec(db_conn, dither.visit)?;
            apply_dither_offset(dither, anchor, offset, self.use_guide_offsets);
        }
        Ok(())
    }
    /// Loads the dithers of the visits that are not in the raw dithers yet
    ///
    /// The `data_id` defaults to the data identifier template of the
    /// configuration. The dithers are frozen after each visit, and once more
    /// at the end if they are behind the raw dithers, e.g. when all the visits
    /// were already cached after [DitherSet::update_visits].
    /// A spectrograph or a visit that fails is skipped and recorded in the
    /// returned [LoadReport].
    pub fn load_available(
        &mut self,
        data_id: Option<&DataId>,
        options: &LoadOptions,
    ) -> Result<LoadReport> {
        if self.visits.is_empty() {
            return Err(DitherError::NoVisits(self.name.clone()));
        }
        if options.force_reload {
            self.flush();
        }
        let config = self.config.clone();
        let data_id = data_id.unwrap_or(config.data_id_template());

        let mut anchor: Option<Anchor> = None;
        let mut outcomes = vec![];
        for visit in self.visits.clone() {
            if self.raw_dithers.iter().any(|d| d.visit == visit) {
                log::info!("{visit} is cached");
                outcomes.push(VisitOutcome::Cached { visit });
                continue;
            }
            log::info!("Processing {visit}");

            let (dither, spectrographs, skipped) =
                self.make_visit_dither(data_id, visit, options);
            let outcome = match dither {
                Ok(mut dither) => {
                    log::info!("made dither {visit}");
                    let correction_failure = self
                        .correct_position(&mut dither, &mut anchor, options.use_dither_offset)
                        .err()
                        .map(|e| {
                            log::warn!("failed to calculate guide offsets of {visit}: {e}");
                            e.to_string()
                        });
                    self.raw_dithers.push(dither);
                    VisitOutcome::Loaded {
                        visit,
                        spectrographs,
                        skipped,
                        correction_failure,
                    }
                }
                Err(reason) => {
                    log::warn!("no dither for visit {visit}");
                    VisitOutcome::Missing {
                        visit,
                        skipped,
                        reason,
                    }
                }
            };
            outcomes.push(outcome);
            self.freeze();
        }
        if self.dithers.len() != self.raw_dithers.len().min(self.visits.len()) {
            self.freeze();
        }
        let report = LoadReport {
            outcomes,
            obtained: self.raw_dithers.len(),
            requested: self.visits.len(),
        };
        log::info!("{}: {report}", self.name);
        Ok(report)
    }
}
