//! Footprint codec: shared-prefix compression of vertex geocodes.
//!
//! A footprint is stored as the first vertex's full-precision geocode
//! followed by one comma-separated fragment per remaining vertex, each
//! fragment being the suffix left after stripping the longest prefix
//! shared with the previous vertex's full code. Nearby vertices share
//! long prefixes, so fragments are usually two or three characters.
//! Compression is exact with respect to the quantized vertex codes; any
//! precision loss happened in [`super::encode`], not here.

use geo::Coord;

use super::{GeocodeError, decode as decode_point, encode as encode_point};

/// Precision of footprint vertex codes.
pub const VERTEX_PRECISION: usize = 11;

/// Encode polygon vertices. Order is preserved, not normalized.
pub fn encode(vertices: &[Coord<f64>]) -> Result<String, GeocodeError> {
    if vertices.is_empty() {
        return Err(GeocodeError::MalformedFootprint(
            "footprint has no vertices".into(),
        ));
    }
    let mut full = Vec::with_capacity(vertices.len());
    for &vertex in vertices {
        full.push(encode_point(vertex, VERTEX_PRECISION)?);
    }
    let mut out = full[0].clone();
    for pair in full.windows(2) {
        let shared = common_prefix(&pair[1], &pair[0]);
        out.push(',');
        out.push_str(&pair[1][shared..]);
    }
    Ok(out)
}

/// Decode a footprint string back to vertex cell centers.
///
/// Each fragment replaces the tail of the previous reconstructed code;
/// an empty fragment repeats it (two identical vertices). The whole
/// string is rejected on the first inconsistent fragment, never a
/// partial vertex list.
pub fn decode(s: &str) -> Result<Vec<Coord<f64>>, GeocodeError> {
    let mut fields = s.split(',');
    let first = fields.next().unwrap_or_default();
    let mut vertices = vec![decode_point(first)?];
    let mut prev = first.to_string();
    for fragment in fields {
        if fragment.len() > prev.len() {
            return Err(GeocodeError::MalformedFootprint(format!(
                "fragment {fragment:?} longer than the {}-character code",
                prev.len()
            )));
        }
        let code = format!("{}{}", &prev[..prev.len() - fragment.len()], fragment);
        vertices.push(decode_point(&code)?);
        prev = code;
    }
    Ok(vertices)
}

/// Index of the first differing character; the full length when equal.
fn common_prefix(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}
