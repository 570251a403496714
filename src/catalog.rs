//! Dither sets definitions
//!
//! A catalog is a text file with one dither set per line:
//! ```text
//! # name: visits # comment
//! raster1: 83217 83218 83219 # 3x1 raster, 0.5" steps
//! raster2: 83220, 83221
//! ```

use std::{
    env::{self, VarError},
    fs, io,
    num::ParseIntError,
    ops::Deref,
    path::Path,
    str::FromStr,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(r#""DITHER_SETS" env var is not set"#)]
    Env(#[from] VarError),
    #[error("failed to read {1}")]
    ReadFile(#[source] io::Error, String),
    #[error("invalid dither set catalog regex")]
    Regex(#[from] regex::Error),
    #[error(r#"line {0}: {1:?} doesn't match "name: visit visit ... # comment""#)]
    Pattern(usize, String),
    #[error("line {0}: invalid visit {1:?}")]
    Visit(usize, String, #[source] ParseIntError),
}
type Result<T> = std::result::Result<T, CatalogError>;

/// Definition of a dither set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DitherSetSpec {
    pub name: String,
    pub visits: Vec<u32>,
    pub comment: Option<String>,
}

/// Dither sets definitions
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DitherSetCatalog(Vec<DitherSetSpec>);
impl Deref for DitherSetCatalog {
    type Target = Vec<DitherSetSpec>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl DitherSetCatalog {
    /// Reads the catalog from the file which path is given by the env variable `DITHER_SETS`
    pub fn from_env() -> Result<Self> {
        let filename = env::var("DITHER_SETS")?;
        Self::from_file(filename)
    }
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| CatalogError::ReadFile(e, path.display().to_string()))?;
        let catalog: Self = contents.parse()?;
        log::info!("{} dither sets read from {:?}", catalog.len(), path);
        Ok(catalog)
    }
}
impl FromStr for DitherSetCatalog {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        let re = Regex::new(r"^([\w.+-]+)\s*:\s*([^#]*?)\s*(?:#\s*(.*?))?\s*$")?;
        let mut specs = vec![];
        for (i, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let capts = re
                .captures(line)
                .ok_or_else(|| CatalogError::Pattern(i + 1, line.to_string()))?;
            let visits = capts
                .get(2)
                .map_or("", |m| m.as_str())
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|v| !v.is_empty())
                .map(|v| {
                    v.parse::<u32>()
                        .map_err(|e| CatalogError::Visit(i + 1, v.to_string(), e))
                })
                .collect::<Result<Vec<u32>>>()?;
            specs.push(DitherSetSpec {
                name: capts[1].to_string(),
                visits,
                comment: capts
                    .get(3)
                    .map(|m| m.as_str().to_string())
                    .filter(|c| !c.is_empty()),
            });
        }
        Ok(Self(specs))
    }
}
impl FromIterator<DitherSetSpec> for DitherSetCatalog {
    fn from_iter<T: IntoIterator<Item = DitherSetSpec>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
impl IntoIterator for DitherSetCatalog {
    type Item = DitherSetSpec;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
