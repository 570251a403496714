//! Dither positional corrections

use crate::{Dither, DitherOffset};

pub const ARCSEC_PER_DEG: f64 = 3600f64;

/// Reference position of a dither set [deg]
///
/// All the corrected positions are relative to the uncorrected position of
/// the first visit that went through the correction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub ra: f64,
    pub dec: f64,
}
impl<P> From<&Dither<P>> for Anchor {
    fn from(dither: &Dither<P>) -> Self {
        Self {
            ra: dither.ra,
            dec: dither.dec,
        }
    }
}
impl Anchor {
    /// Returns the position offset by `(raoff,decoff)` [arcsec]
    pub fn offset_by(&self, raoff: f64, decoff: f64) -> (f64, f64) {
        (
            self.ra + raoff / ARCSEC_PER_DEG,
            self.dec + decoff / ARCSEC_PER_DEG,
        )
    }
}

fn nan_to_zero(value: f64) -> f64 {
    if value.is_nan() {
        0f64
    } else {
        value
    }
}

/// Returns the on-sky offset [arcsec] of a commanded dither at declination `dec` [deg]
///
/// The offset along right ascension is divided by `cos(dec)`, NaN offsets are set to 0
pub fn sky_offset(offset: DitherOffset, dec: f64) -> (f64, f64) {
    (
        nan_to_zero(offset.dither_ra / dec.to_radians().cos()),
        nan_to_zero(offset.dither_dec),
    )
}

/// Moves a dither to the anchor position offset by the commanded dither offset,
/// optionally adding the guider offset
pub fn apply_dither_offset<P>(
    dither: &mut Dither<P>,
    anchor: Anchor,
    offset: DitherOffset,
    use_guide_offsets: bool,
) {
    dither.dither_offset = Some(offset);
    let (mut raoff, mut decoff) = sky_offset(offset, dither.dec);
    if use_guide_offsets {
        if let Some(guide) = dither.guide_offset {
            raoff += guide.dra;
            decoff += guide.ddec;
        }
    }
    (dither.ra, dither.dec) = anchor.offset_by(raoff, decoff);
}
