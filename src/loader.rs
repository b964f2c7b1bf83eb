// SPDX-License-Identifier: Apache-2.0

//! The harness-facing text format (spec.md §6, "not the core"): first line
//! `<count> <dim>`, then one point per line, comma- or space-separated
//! coordinates. Consumed only by `src/bin/oddson-cli.rs` and test fixtures
//! — the library itself never reads files.

use std::io::BufRead;

use crate::errors::{OddsonError, OddsonResult};

/// A flat, row-major point buffer plus its declared dimension, ready to
/// hand to [`crate::point::PointSet::new`].
pub struct LoadedPoints {
    pub data: Vec<f64>,
    pub dim: usize,
}

/// Parses the text format from any line-buffered reader (a file, stdin, or
/// an in-memory cursor in tests).
pub fn load<R: BufRead>(reader: R) -> OddsonResult<LoadedPoints> {
    let mut lines = reader.lines();

    let header = lines
        .next()
        .ok_or_else(|| OddsonError::ParseError {
            line: Some(1),
            message: "missing header line".to_string(),
        })?
        .map_err(OddsonError::from)?;
    let mut header_fields = header.split_whitespace();
    let count: usize = header_fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| OddsonError::ParseError {
            line: Some(1),
            message: format!("malformed count in header: {:?}", header),
        })?;
    let dim: usize = header_fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| OddsonError::ParseError {
            line: Some(1),
            message: format!("malformed dimension in header: {:?}", header),
        })?;
    if count == 0 {
        return Err(OddsonError::InvalidInput {
            message: "point count must be positive".to_string(),
        });
    }
    if dim < 2 {
        return Err(OddsonError::InvalidInput {
            message: format!("dimension must be >= 2, got {}", dim),
        });
    }

    let mut data = Vec::with_capacity(count * dim);
    for (i, line) in lines.enumerate() {
        let line_no = i + 2;
        let line = line.map_err(OddsonError::from)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fields: Vec<&str> = if trimmed.contains(',') {
            trimmed.split(',').map(str::trim).collect()
        } else {
            trimmed.split_whitespace().collect()
        };
        if fields.len() != dim {
            return Err(OddsonError::ParseError {
                line: Some(line_no),
                message: format!("expected {} coordinates, got {}", dim, fields.len()),
            });
        }
        for field in fields {
            let value: f64 = field.parse().map_err(|_| OddsonError::ParseError {
                line: Some(line_no),
                message: format!("malformed coordinate: {:?}", field),
            })?;
            data.push(value);
        }
    }

    if data.len() != count * dim {
        return Err(OddsonError::ParseError {
            line: None,
            message: format!(
                "header declared {} points but file has {}",
                count,
                data.len() / dim
            ),
        });
    }

    Ok(LoadedPoints { data, dim })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_comma_separated_rows() {
        let text = "3 2\n0,0\n1,0\n0,1\n";
        let loaded = load(Cursor::new(text)).unwrap();
        assert_eq!(loaded.dim, 2);
        assert_eq!(loaded.data, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn parses_space_separated_rows() {
        let text = "2 3\n1 2 3\n4 5 6\n";
        let loaded = load(Cursor::new(text)).unwrap();
        assert_eq!(loaded.dim, 3);
        assert_eq!(loaded.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn rejects_malformed_header() {
        let text = "not-a-header\n";
        assert!(load(Cursor::new(text)).is_err());
    }

    #[test]
    fn rejects_short_file() {
        let text = "2 2\n0,0\n";
        assert!(load(Cursor::new(text)).is_err());
    }

    #[test]
    fn rejects_dimension_below_two() {
        let text = "2 1\n0\n1\n";
        assert!(load(Cursor::new(text)).is_err());
    }

    #[test]
    fn rejects_non_positive_point_count() {
        // spec.md §7: "non-positive point count" is an InvalidInput
        // condition at the harness boundary. A header of `0 2` with no
        // point lines otherwise passes the length check trivially.
        let text = "0 2\n";
        assert!(load(Cursor::new(text)).is_err());
    }
}
