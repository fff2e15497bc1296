use crate::core::{FieldDataset, FieldSample, FieldUnit};
use crate::error::{CageError, CageResult};
use std::io;
use std::path::Path;
use tracing::info;

/// Characters stripped from header cells before tokenizing
const HEADER_PUNCTUATION: &str = "-=+,.~`*&^%$#@!{}[]()_";

/// Load a field dataset from a CSV file
///
/// The header row declares the three axis columns in x, y, z order with one
/// field unit for the whole file, e.g. `B Field - ECF x (nT)`. Body rows
/// are three floats; blank rows are skipped; a row with a missing value is
/// rejected as unbalanced.
pub fn load_field_csv(path: &Path) -> CageResult<FieldDataset> {
    let rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| CageError::data(format!("cannot read {}: {e}", path.display())))?;
    let dataset = read_dataset(rdr)?;
    info!(
        path = %path.display(),
        samples = dataset.len(),
        unit = %dataset.unit(),
        "dataset extracted"
    );
    Ok(dataset)
}

/// Parse a dataset out of any CSV reader
pub fn read_dataset<R: io::Read>(mut rdr: csv::Reader<R>) -> CageResult<FieldDataset> {
    let headers = rdr
        .headers()
        .map_err(|e| CageError::data(format!("cannot read header row: {e}")))?
        .clone();
    let unit = detect_unit(&headers)?;

    let mut samples = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| CageError::data(format!("cannot read row: {e}")))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        if record.len() < 3 || record.iter().take(3).any(|cell| cell.is_empty()) {
            return Err(CageError::data(format!(
                "unbalanced data at row {}: each axis needs a value",
                samples.len() + 2
            )));
        }
        let mut components = [0.0f64; 3];
        for (i, value) in components.iter_mut().enumerate() {
            *value = record[i].parse::<f64>().map_err(|_| {
                CageError::data(format!(
                    "row {}: '{}' is not a number",
                    samples.len() + 2,
                    &record[i]
                ))
            })?;
        }
        samples.push(FieldSample::new(components[0], components[1], components[2]));
    }

    Ok(FieldDataset::new(samples, unit))
}

/// Validate the header row and extract the file-wide field unit
fn detect_unit(headers: &csv::StringRecord) -> CageResult<FieldUnit> {
    if headers.len() < 3 {
        return Err(CageError::data(
            "header must declare three axis columns ordered x, y and z",
        ));
    }

    let mut units = Vec::with_capacity(3);
    for (cell, expected_axis) in headers.iter().take(3).zip(["x", "y", "z"]) {
        let (axis, unit) = split_header(cell)?;
        if !axis.eq_ignore_ascii_case(expected_axis) {
            return Err(CageError::data(format!(
                "header column '{cell}' is out of order, expected the {expected_axis} axis"
            )));
        }
        units.push(unit);
    }
    if units[0] != units[1] || units[0] != units[2] {
        return Err(CageError::data(
            "all three axis columns must use the same unit",
        ));
    }

    units[0].parse::<FieldUnit>()
}

/// Reduce a header cell like `B Field - ECF x (nT)` to its axis letter and
/// unit label, the last two tokens after punctuation is stripped
fn split_header(cell: &str) -> CageResult<(String, String)> {
    let cleaned: String = cell
        .chars()
        .map(|c| if HEADER_PUNCTUATION.contains(c) { ' ' } else { c })
        .collect();
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    match tokens[..] {
        [.., axis, unit] => Ok((axis.to_string(), unit.to_string())),
        _ => Err(CageError::data(format!(
            "header column '{cell}' must name an axis and a unit, e.g. 'B Field - ECF x (nT)'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(content: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes())
    }

    #[test]
    fn test_extract_well_formed_file() {
        let csv = "\
B Field - ECF x (nT),B Field - ECF y (nT),B Field - ECF z (nT)
100.0,0.0,0.0
0.0,-100.0,0.0
0.0,0.0,100.0
";
        let dataset = read_dataset(reader(csv)).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.unit(), FieldUnit::Nanotesla);
        assert!(dataset.samples()[1].y_neg);
        assert!(!dataset.samples()[1].x_neg);
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let csv = "x (G),y (G),z (G)\n1,2,3\n,,\n4,5,6\n";
        let dataset = read_dataset(reader(csv)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.unit(), FieldUnit::Gauss);
    }

    #[test]
    fn test_unbalanced_row_is_rejected() {
        let csv = "x (nT),y (nT),z (nT)\n1.0,,3.0\n";
        let err = read_dataset(reader(csv)).unwrap_err();
        assert!(matches!(err, CageError::Data(_)));
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn test_mixed_units_are_rejected() {
        let csv = "x (nT),y (G),z (nT)\n1,2,3\n";
        let err = read_dataset(reader(csv)).unwrap_err();
        assert!(matches!(err, CageError::Data(_)));
    }

    #[test]
    fn test_unknown_unit_is_an_error() {
        let csv = "x (mG),y (mG),z (mG)\n1,2,3\n";
        let err = read_dataset(reader(csv)).unwrap_err();
        assert!(matches!(err, CageError::UnrecognizedUnit(_)));
    }

    #[test]
    fn test_axis_order_is_enforced() {
        let csv = "y (nT),x (nT),z (nT)\n1,2,3\n";
        let err = read_dataset(reader(csv)).unwrap_err();
        assert!(matches!(err, CageError::Data(_)));
    }

    #[test]
    fn test_non_numeric_cell_is_rejected() {
        let csv = "x (nT),y (nT),z (nT)\n1.0,abc,3.0\n";
        let err = read_dataset(reader(csv)).unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }
}
