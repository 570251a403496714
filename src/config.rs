use std::{collections::BTreeMap, fmt, rc::Rc};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::Raster;

/// Spectrograph arm
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    /// Blue
    B,
    /// Red
    #[default]
    R,
    /// Near infrared
    N,
    /// Medium resolution red
    M,
}

/// Butler data identifier
///
/// The keys the dither sets care about are explicit, anything else the
/// butler needs goes into `extra`
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataId {
    pub visit: Option<u32>,
    pub arm: Option<Arm>,
    pub spectrograph: Option<u8>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}
impl DataId {
    pub fn new() -> Self {
        Default::default()
    }
    /// Adds a key/value pair to the identifier
    pub fn with<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.extra.insert(key.into(), value.to_string());
        self
    }
    /// Returns a copy of the identifier for a given visit, arm and spectrograph
    pub fn exposure(&self, visit: u32, arm: Arm, spectrograph: u8) -> Self {
        Self {
            visit: Some(visit),
            arm: Some(arm),
            spectrograph: Some(spectrograph),
            extra: self.extra.clone(),
        }
    }
}
impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items = vec![];
        if let Some(visit) = self.visit {
            items.push(format!("visit={visit}"));
        }
        if let Some(arm) = self.arm {
            items.push(format!("arm={arm}"));
        }
        if let Some(spectrograph) = self.spectrograph {
            items.push(format!("spectrograph={spectrograph}"));
        }
        items.extend(self.extra.iter().map(|(k, v)| format!("{k}={v}")));
        write!(f, "{{{}}}", items.join(", "))
    }
}

/// Returns the key of the fiber traces of a given arm and spectrograph, e.g. `r1`
pub fn fiber_traces_key(arm: Arm, spectrograph: u8) -> String {
    format!("{arm}{spectrograph}")
}

/// Dither sets configuration
///
/// Bundles the handles to the raster library, the butler, the database and
/// the detector calibrations shared by all the dither sets of a
/// [DitherSetCollection](crate::DitherSetCollection).
/// Once built, the configuration is wrapped into an [Rc] and never modified.
pub struct DitherConfig<L: Raster> {
    raster: L,
    butler: L::Butler,
    db_conn: L::DbConn,
    data_id: DataId,
    fiber_traces: BTreeMap<String, L::FiberTraces>,
    camera: L::Camera,
    wavelength_range: (f64, f64),
}
impl<L: Raster> DitherConfig<L> {
    pub fn new(raster: L, butler: L::Butler, db_conn: L::DbConn, camera: L::Camera) -> Self {
        Self {
            raster,
            butler,
            db_conn,
            data_id: DataId::default(),
            fiber_traces: BTreeMap::new(),
            camera,
            wavelength_range: (0f64, f64::INFINITY),
        }
    }
    /// Sets the data identifier template
    pub fn data_id(self, data_id: DataId) -> Self {
        Self { data_id, ..self }
    }
    /// Adds the fiber traces of a given arm and spectrograph
    pub fn fiber_traces(mut self, arm: Arm, spectrograph: u8, fiber_traces: L::FiberTraces) -> Self {
        self.fiber_traces
            .insert(fiber_traces_key(arm, spectrograph), fiber_traces);
        self
    }
    /// Sets the wavelength range `[lmin,lmax]` in nm
    pub fn wavelength_range(self, lmin: f64, lmax: f64) -> Self {
        Self {
            wavelength_range: (lmin, lmax),
            ..self
        }
    }
    pub fn into_shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn raster(&self) -> &L {
        &self.raster
    }
    pub fn butler(&self) -> &L::Butler {
        &self.butler
    }
    pub fn db_conn(&self) -> &L::DbConn {
        &self.db_conn
    }
    pub fn data_id_template(&self) -> &DataId {
        &self.data_id
    }
    pub fn camera(&self) -> &L::Camera {
        &self.camera
    }
    pub fn lmin(&self) -> f64 {
        self.wavelength_range.0
    }
    pub fn lmax(&self) -> f64 {
        self.wavelength_range.1
    }
    /// Returns the fiber traces of a given arm and spectrograph
    pub fn traces(&self, arm: Arm, spectrograph: u8) -> Option<&L::FiberTraces> {
        self.fiber_traces.get(&fiber_traces_key(arm, spectrograph))
    }
}
