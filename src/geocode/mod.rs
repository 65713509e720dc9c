//! Geocode encoding: fixed-precision base-32 point codes.
//!
//! A geocode names a rectangular cell of latitude/longitude space by
//! recursively bisecting the two axes, longitude first, and packing the
//! bisection bits five at a time into characters of [`ALPHABET`]. More
//! characters means a smaller cell; `decode` returns the cell center, so
//! a round trip is lossy by at most half a cell along each axis.

use geo::Coord;
use thiserror::Error;

pub mod footprint;

/// The 32-character geocode alphabet (digits plus lowercase letters with
/// the ambiguous `a`, `i`, `l`, `o` removed). Fixed: codes must decode
/// identically in every implementation that shares this table.
pub const ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Conventional precision for single-point (centroid) codes.
pub const POINT_PRECISION: usize = 9;

/// Errors from the geocode and footprint codecs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeocodeError {
    /// Coordinate outside valid bounds, or a zero precision.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A code that is empty or contains a character outside the alphabet.
    #[error("invalid geocode {0:?}")]
    InvalidCode(String),

    /// A footprint string whose fragments cannot be reconstructed.
    #[error("malformed footprint: {0}")]
    MalformedFootprint(String),
}

/// Encode a coordinate (`x` = longitude, `y` = latitude) as a geocode of
/// exactly `precision` characters.
pub fn encode(point: Coord<f64>, precision: usize) -> Result<String, GeocodeError> {
    if precision == 0 {
        return Err(GeocodeError::InvalidRange(
            "precision must be at least 1".into(),
        ));
    }
    let (lat, lon) = (point.y, point.x);
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(GeocodeError::InvalidRange(format!(
            "coordinate ({lat}, {lon}) outside [-90, 90] x [-180, 180]"
        )));
    }

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lon_lo, mut lon_hi) = (-180.0_f64, 180.0_f64);
    let mut code = String::with_capacity(precision);
    let mut lon_turn = true; // longitude claims the first bit of every code
    let mut index = 0usize;
    let mut bits = 0u8;
    while code.len() < precision {
        index <<= 1;
        if lon_turn {
            let mid = (lon_lo + lon_hi) / 2.0;
            if lon >= mid {
                index |= 1;
                lon_lo = mid;
            } else {
                lon_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if lat >= mid {
                index |= 1;
                lat_lo = mid;
            } else {
                lat_hi = mid;
            }
        }
        lon_turn = !lon_turn;
        bits += 1;
        if bits == 5 {
            code.push(ALPHABET[index] as char);
            index = 0;
            bits = 0;
        }
    }
    Ok(code)
}

/// Decode a geocode to the center of its bounding cell.
pub fn decode(code: &str) -> Result<Coord<f64>, GeocodeError> {
    if code.is_empty() {
        return Err(GeocodeError::InvalidCode(code.to_string()));
    }
    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lon_lo, mut lon_hi) = (-180.0_f64, 180.0_f64);
    let mut lon_turn = true;
    for ch in code.chars() {
        let index = ALPHABET
            .iter()
            .position(|&b| b as char == ch)
            .ok_or_else(|| GeocodeError::InvalidCode(code.to_string()))?;
        for shift in (0..5).rev() {
            let bit = (index >> shift) & 1;
            if lon_turn {
                let mid = (lon_lo + lon_hi) / 2.0;
                if bit == 1 {
                    lon_lo = mid;
                } else {
                    lon_hi = mid;
                }
            } else {
                let mid = (lat_lo + lat_hi) / 2.0;
                if bit == 1 {
                    lat_lo = mid;
                } else {
                    lat_hi = mid;
                }
            }
            lon_turn = !lon_turn;
        }
    }
    Ok(Coord {
        x: (lon_lo + lon_hi) / 2.0,
        y: (lat_lo + lat_hi) / 2.0,
    })
}

/// Cell dimensions (latitude span, longitude span) in degrees at a given
/// precision. Each character contributes 5 bisection bits split between
/// the axes, longitude first, so the quantization error of [`decode`] is
/// at most half of each span.
pub fn cell_size(precision: usize) -> (f64, f64) {
    let lat_bits = (5 * precision) / 2;
    let lon_bits = 5 * precision - lat_bits;
    (
        180.0 / (lat_bits as f64).exp2(),
        360.0 / (lon_bits as f64).exp2(),
    )
}
