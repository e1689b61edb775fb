use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::points::Point;
use crate::HacError;

/// Read `x,y` coordinate pairs, one pair per line, from any reader.
///
/// Blank lines are skipped. A trailing comma, a missing field, or a field
/// that does not parse as a float is reported with its 1-based line number.
pub fn read_csv_points_from_reader<R: Read>(reader: R) -> Result<Vec<Point>, HacError> {
    let mut points = Vec::new();

    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut fields = trimmed.split(',');
        let x = parse_field(fields.next(), line_no)?;
        let y = parse_field(fields.next(), line_no)?;
        if let Some(extra) = fields.next() {
            if !extra.trim().is_empty() {
                return Err(HacError::InvalidInput {
                    line: line_no,
                    detail: format!("expected two fields, found extra {:?}", extra.trim()),
                });
            }
        }
        points.push(Point::new(x, y));
    }

    Ok(points)
}

/// Read coordinate pairs from a CSV file on disk.
pub fn read_csv_points<P: AsRef<Path>>(path: P) -> Result<Vec<Point>, HacError> {
    let file = File::open(path)?;
    read_csv_points_from_reader(file)
}

fn parse_field(field: Option<&str>, line: usize) -> Result<f64, HacError> {
    let raw = field.map(str::trim).filter(|f| !f.is_empty()).ok_or_else(|| {
        HacError::InvalidInput {
            line,
            detail: "expected two comma-separated fields".to_string(),
        }
    })?;
    raw.parse::<f64>().map_err(|_| HacError::InvalidInput {
        line,
        detail: format!("not a number: {raw:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_simple_pairs() {
        let input = "0.0,0.0\n1.5,-2.0\n\n10,10\n";
        let points = read_csv_points_from_reader(Cursor::new(input)).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], Point::new(1.5, -2.0));
        assert_eq!(points[2], Point::new(10.0, 10.0));
    }

    #[test]
    fn tolerates_whitespace_around_fields() {
        let input = " 1.0 , 2.0 \n";
        let points = read_csv_points_from_reader(Cursor::new(input)).unwrap();
        assert_eq!(points, vec![Point::new(1.0, 2.0)]);
    }

    #[test]
    fn missing_field_reports_line_number() {
        let input = "0,0\n1.0\n";
        let err = read_csv_points_from_reader(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, HacError::InvalidInput { line: 2, .. }));
    }

    #[test]
    fn garbage_field_reports_line_number() {
        let input = "0,0\n2,2\nnope,3\n";
        let err = read_csv_points_from_reader(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, HacError::InvalidInput { line: 3, .. }));
    }

    #[test]
    fn extra_field_is_rejected() {
        let input = "1,2,3\n";
        let err = read_csv_points_from_reader(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, HacError::InvalidInput { line: 1, .. }));
    }

    #[test]
    fn trailing_comma_is_allowed() {
        let input = "1,2,\n";
        let points = read_csv_points_from_reader(Cursor::new(input)).unwrap();
        assert_eq!(points, vec![Point::new(1.0, 2.0)]);
    }
}
