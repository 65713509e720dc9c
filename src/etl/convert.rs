//! Per-field converters applied to raw export rows.
//!
//! The raw building-model exports carry every attribute as text, with
//! the quirks of the upstream tooling: float-formatted integers, `_` as
//! an in-field list separator, `lat/lon` coordinate pairs, areas in
//! square feet. Count-like fields default to zero on unparseable input;
//! geometry and measured fields fail loudly.

use anyhow::{Context, Result};
use geo::Coord;

use crate::geocode::{self, POINT_PRECISION, footprint};

/// Float-tolerant year parse ("1940.0" happens); 0 on failure.
pub fn to_year(s: &str) -> i32 {
    s.trim().parse::<f64>().map(|y| y as i32).unwrap_or(0)
}

/// `"lat/lon"` to a centroid geocode.
pub fn to_centroid(s: &str) -> Result<String> {
    let point = parse_coord(s)?;
    geocode::encode(point, POINT_PRECISION)
        .with_context(|| format!("encoding centroid {s:?}"))
}

/// `_`-separated `"lat/lon"` vertices to a prefix-compressed footprint.
pub fn to_footprint(s: &str) -> Result<String> {
    let vertices = s.split('_').map(parse_coord).collect::<Result<Vec<_>>>()?;
    footprint::encode(&vertices).with_context(|| format!("encoding footprint {s:?}"))
}

/// Square feet to square meters, one decimal.
pub fn to_area(s: &str) -> Result<f64> {
    let sqft: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("bad area {s:?}"))?;
    Ok(round1(sqft * 0.09))
}

/// Height in meters, one decimal.
pub fn to_height(s: &str) -> Result<f64> {
    let meters: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("bad height {s:?}"))?;
    Ok(round1(meters))
}

/// Float-tolerant floor count; 0 on failure.
pub fn to_floors(s: &str) -> u32 {
    s.trim().parse::<f64>().map(|f| f as u32).unwrap_or(0)
}

/// Mean of `_`-separated window-to-wall ratios; 0.0 on failure.
pub fn to_windows(s: &str) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for part in s.split('_') {
        match part.trim().parse::<f64>() {
            Ok(v) => {
                sum += v;
                count += 1;
            }
            Err(_) => return 0.0,
        }
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Anything but the literal "0" marks mixed use.
pub fn is_mixed(s: &str) -> bool {
    s != "0"
}

fn parse_coord(s: &str) -> Result<Coord<f64>> {
    let (lat, lon) = s
        .split_once('/')
        .with_context(|| format!("expected \"lat/lon\", got {s:?}"))?;
    Ok(Coord {
        x: lon
            .trim()
            .parse()
            .with_context(|| format!("bad longitude in {s:?}"))?,
        y: lat
            .trim()
            .parse()
            .with_context(|| format!("bad latitude in {s:?}"))?,
    })
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_tolerates_float_text() {
        assert_eq!(to_year("1940.0"), 1940);
        assert_eq!(to_year("1940"), 1940);
        assert_eq!(to_year(""), 0);
        assert_eq!(to_year("n/a"), 0);
    }

    #[test]
    fn centroid_encodes_at_point_precision() {
        assert_eq!(to_centroid("44.1141/-69.1142").unwrap(), "dryfgq8x6");
        assert!(to_centroid("44.1141").is_err());
        assert!(to_centroid("x/y").is_err());
    }

    #[test]
    fn footprint_encodes_vertex_chain() {
        let raw = "44.11418/-69.11418_44.11414/-69.11411_44.11408/-69.11417_44.11411/-69.11425";
        assert_eq!(to_footprint(raw).unwrap(), "dryfgq8xdzh,kx8,5he,34p");
    }

    #[test]
    fn areas_convert_to_square_meters() {
        assert_eq!(to_area("650").unwrap(), 58.5);
        assert_eq!(to_area("1301.1").unwrap(), 117.1);
        assert!(to_area("tall").is_err());
    }

    #[test]
    fn heights_round_to_one_decimal() {
        assert_eq!(to_height("6.1").unwrap(), 6.1);
        assert_eq!(to_height("6.14").unwrap(), 6.1);
    }

    #[test]
    fn floors_default_to_zero() {
        assert_eq!(to_floors("2.0"), 2);
        assert_eq!(to_floors(""), 0);
    }

    #[test]
    fn windows_average_the_ratio_list() {
        assert_eq!(to_windows("0.14"), 0.14);
        assert!((to_windows("0.1_0.2") - 0.15).abs() < 1e-12);
        assert_eq!(to_windows(""), 0.0);
        assert_eq!(to_windows("0.1_x"), 0.0);
    }

    #[test]
    fn mixed_flag_is_not_zero() {
        assert!(!is_mixed("0"));
        assert!(is_mixed("1"));
    }
}
