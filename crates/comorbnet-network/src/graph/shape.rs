//! Decorative per-node width/height attributes.
//!
//! Width and height are rank fractions of two per-node counts (for example
//! case counts by sex): `rank_min(count) / n`, where tied counts share the
//! lowest rank. The largest count therefore maps to `1.0`.

use std::io::Read;

use comorbnet_core::DiseaseCode;
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Width and height of a node, each in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeShape {
    pub width: f64,
    pub height: f64,
}

/// Per-node counts that drive the shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCounts {
    pub code: DiseaseCode,
    pub width_count: f64,
    pub height_count: f64,
}

/// `rank(method = "min") / n` for each value, in input order.
#[must_use]
pub fn rank_fraction(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    values
        .iter()
        .map(|&v| {
            let below = values.iter().filter(|&&other| other < v).count();
            (below + 1) as f64 / n
        })
        .collect()
}

/// Shapes from raw counts.
#[must_use]
pub fn shapes_from_counts(counts: &[ShapeCounts]) -> Vec<(DiseaseCode, NodeShape)> {
    let widths = rank_fraction(&counts.iter().map(|c| c.width_count).collect::<Vec<_>>());
    let heights = rank_fraction(&counts.iter().map(|c| c.height_count).collect::<Vec<_>>());
    counts
        .iter()
        .zip(widths.into_iter().zip(heights))
        .map(|(c, (width, height))| (c.code, NodeShape { width, height }))
        .collect()
}

#[derive(Debug, Deserialize)]
struct ShapeRow {
    #[serde(alias = "node", alias = "code")]
    node_code: String,
    width: f64,
    height: f64,
}

/// Read shapes from a CSV with columns `node_code,width,height`.
///
/// # Errors
///
/// Returns [`NetworkError::Malformed`] for an invalid code or a non-positive
/// dimension, and CSV errors for unreadable input.
pub fn read_shapes_csv<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<(DiseaseCode, NodeShape)>, NetworkError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut shapes = Vec::new();
    for (line, row) in csv_reader.deserialize::<ShapeRow>().enumerate() {
        let row = row?;
        let malformed = |detail: String| NetworkError::Malformed {
            source_name: source_name.to_string(),
            detail: format!("record {}: {detail}", line + 1),
        };
        let code = DiseaseCode::parse(&row.node_code)
            .map_err(|_| malformed(format!("invalid code {:?}", row.node_code)))?;
        if !(row.width > 0.0 && row.height > 0.0) {
            return Err(malformed(format!("{code} has a non-positive dimension")));
        }
        shapes.push((
            code,
            NodeShape {
                width: row.width,
                height: row.height,
            },
        ));
    }
    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> DiseaseCode {
        DiseaseCode::parse(raw).expect("valid code")
    }

    #[test]
    fn ties_share_the_lowest_rank() {
        let ranks = rank_fraction(&[10.0, 30.0, 10.0, 20.0]);
        assert_eq!(ranks, vec![0.25, 1.0, 0.25, 0.75]);
    }

    #[test]
    fn width_and_height_rank_independently() {
        let shapes = shapes_from_counts(&[
            ShapeCounts { code: code("A00"), width_count: 1.0, height_count: 9.0 },
            ShapeCounts { code: code("B01"), width_count: 5.0, height_count: 3.0 },
        ]);
        assert_eq!(shapes[0], (code("A00"), NodeShape { width: 0.5, height: 1.0 }));
        assert_eq!(shapes[1], (code("B01"), NodeShape { width: 1.0, height: 0.5 }));
    }

    #[test]
    fn reads_shape_csv() {
        let data = "node_code,width,height\nA00,0.5,1\nB01,1,0.25\n";
        let shapes = read_shapes_csv(data.as_bytes(), "inline").expect("shapes");
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[1].1, NodeShape { width: 1.0, height: 0.25 });
    }

    #[test]
    fn rejects_bad_codes_and_dimensions() {
        assert!(read_shapes_csv("node_code,width,height\na00,1,1\n".as_bytes(), "t").is_err());
        assert!(read_shapes_csv("node_code,width,height\nA00,0,1\n".as_bytes(), "t").is_err());
    }
}
