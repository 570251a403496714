use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
    rc::Rc,
};

use crate::{DitherConfig, DitherError, DitherSet, DitherSetCatalog, Raster, Result};

/// Outcome of [DitherSetCollection::new_dither_set]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    /// An existing dither set has been replaced
    Overwritten,
    /// An existing dither set has been kept as is
    Kept,
}

/// Named dither sets sharing the same configuration
pub struct DitherSetCollection<L: Raster> {
    config: Rc<DitherConfig<L>>,
    spectrographs: Vec<u8>,
    dither_sets: BTreeMap<String, DitherSet<L>>,
}
impl<L: Raster> DitherSetCollection<L> {
    pub fn new(config: Rc<DitherConfig<L>>, spectrographs: &[u8]) -> Self {
        Self {
            config,
            spectrographs: spectrographs.to_vec(),
            dither_sets: BTreeMap::new(),
        }
    }
    /// Creates a collection with copies of the dither sets of another collection
    ///
    /// The raw dithers are copied, the frozen dithers and the images are not
    pub fn from_collection(
        config: Rc<DitherConfig<L>>,
        spectrographs: &[u8],
        other: &DitherSetCollection<L>,
    ) -> Self {
        let mut this = Self::new(config, spectrographs);
        for ds in other.dither_sets.values() {
            let (_, new_ds) = this.new_dither_set(
                ds.name(),
                ds.visits().to_vec(),
                ds.comment().map(String::from),
                false,
            );
            new_ds.set_raw_dithers(ds.raw_dithers().to_vec());
        }
        this
    }
    /// Adds a new dither set
    ///
    /// An existing dither set with the same name is replaced only if `force` is set.
    /// Returns the dither set registered under `name`.
    pub fn new_dither_set<S, V>(
        &mut self,
        name: S,
        visits: V,
        comment: Option<String>,
        force: bool,
    ) -> (Registration, &mut DitherSet<L>)
    where
        S: Into<String>,
        V: IntoIterator<Item = u32>,
    {
        let make = |name: &String| {
            DitherSet::new(
                self.config.clone(),
                name.clone(),
                visits,
                comment,
                &self.spectrographs,
            )
        };
        match self.dither_sets.entry(name.into()) {
            Entry::Occupied(entry) if !force => {
                log::warn!("dither set {} exists, not overwriting", entry.key());
                (Registration::Kept, entry.into_mut())
            }
            Entry::Occupied(mut entry) => {
                log::info!("overwriting dither set {}", entry.key());
                let ds = make(entry.key());
                entry.insert(ds);
                (Registration::Overwritten, entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let ds = make(entry.key());
                (Registration::Created, entry.insert(ds))
            }
        }
    }
    /// Adds all the dither sets of a catalog
    pub fn register_catalog(
        &mut self,
        catalog: &DitherSetCatalog,
        force: bool,
    ) -> Vec<(String, Registration)> {
        catalog
            .iter()
            .map(|spec| {
                let (registration, _) = self.new_dither_set(
                    spec.name.as_str(),
                    spec.visits.iter().copied(),
                    spec.comment.clone(),
                    force,
                );
                (spec.name.clone(), registration)
            })
            .collect()
    }
    pub fn get(&self, name: &str) -> Result<&DitherSet<L>> {
        self.dither_sets
            .get(name)
            .ok_or_else(|| DitherError::UnknownDitherSet(name.to_string()))
    }
    pub fn get_mut(&mut self, name: &str) -> Result<&mut DitherSet<L>> {
        self.dither_sets
            .get_mut(name)
            .ok_or_else(|| DitherError::UnknownDitherSet(name.to_string()))
    }
    pub fn contains(&self, name: &str) -> bool {
        self.dither_sets.contains_key(name)
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dither_sets.keys().map(String::as_str)
    }
    pub fn iter(&self) -> impl Iterator<Item = &DitherSet<L>> {
        self.dither_sets.values()
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DitherSet<L>> {
        self.dither_sets.values_mut()
    }
    pub fn len(&self) -> usize {
        self.dither_sets.len()
    }
    pub fn is_empty(&self) -> bool {
        self.dither_sets.is_empty()
    }
    pub fn spectrographs(&self) -> &[u8] {
        &self.spectrographs
    }
    pub fn config(&self) -> &Rc<DitherConfig<L>> {
        &self.config
    }
}
impl<L: Raster> fmt::Display for DitherSetCollection<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DitherSets({:?})", self.names().collect::<Vec<_>>())
    }
}
