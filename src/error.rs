/// Boxed error returned by the [Raster](crate::Raster) library
pub type RasterError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid update of the visits of a dither set
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VisitUpdateError {
    #[error("fewer visits ({new}) than already exist ({current})")]
    FewerVisits { current: usize, new: usize },
    #[error("new visits do not start with existing visits {0:?}")]
    NotAnExtension(Vec<u32>),
}

#[derive(thiserror::Error, Debug)]
pub enum DitherError {
    #[error("no dither set named {0:?}")]
    UnknownDitherSet(String),
    #[error("invalid visits update")]
    InvalidUpdate(#[from] VisitUpdateError),
    #[error("dither set {0:?} has no visits")]
    NoVisits(String),
    #[error("raster library call failed")]
    Raster(#[source] RasterError),
}
pub type Result<T> = std::result::Result<T, DitherError>;
