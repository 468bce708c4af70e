//! Reading sample matrices from text files.
//!
//! The format is one sample per line with whitespace-separated components, for instance the
//! output of the quaternion generator:
//!
//! ```text
//! 3.14 -12.07 0.50 15.99
//! -8.33 1.00 -0.25 4.75
//! ```
//!
//! Everything after a `#` is a comment and blank lines are ignored. The first data line fixes
//! the number of columns.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::DMatrix;

use crate::error::Error;

/// Parses a sample matrix from `reader`.
///
/// # Examples
///
/// ```
/// use quatnorm::loader::parse_samples;
///
/// let text = "# h i j k\n1.0 2.0 3.0 4.0\n\n5.0 6.0 7.0 8.0  # second\n";
/// let samples = parse_samples(text.as_bytes()).unwrap();
/// assert_eq!(samples.shape(), (2, 4));
/// assert_eq!(samples[(1, 3)], 8.0);
/// ```
pub fn parse_samples<R: BufRead>(reader: R) -> Result<DMatrix<f64>, Error> {
    let mut flat = Vec::new();
    let mut columns = None;
    let mut rows = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let data = line.split('#').next().unwrap_or_default();

        let before = flat.len();
        for token in data.split_whitespace() {
            // `inf` and `nan` parse as floats but are not usable components.
            let value = token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| Error::Parse {
                    line: number,
                    token: token.to_owned(),
                })?;
            flat.push(value);
        }
        let given = flat.len() - before;
        if given == 0 {
            continue;
        }

        match columns {
            None => columns = Some(given),
            Some(expected) if expected != given => {
                return Err(Error::RaggedRow {
                    line: number,
                    expected,
                    given,
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let columns = columns.ok_or(Error::EmptyInput)?;
    tracing::debug!(rows, columns, "parsed sample matrix");
    Ok(DMatrix::from_row_slice(rows, columns, &flat))
}

/// Reads a sample matrix from the file at `path`.
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<DMatrix<f64>, Error> {
    let file = File::open(path)?;
    parse_samples(BufReader::new(file))
}
