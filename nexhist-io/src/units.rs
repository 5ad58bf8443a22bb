//! TOF unit attribute handling.

use crate::{Error, Result};
use hdf5::types::VarLenUnicode;
use hdf5::Dataset;

/// Multiplicative factor from a TOF dataset's storage unit to microseconds.
///
/// Reads the dataset's `units` string attribute. A missing attribute is
/// treated as microseconds; an unrecognized label is an error.
///
/// # Errors
/// Returns an error if the attribute exists but names an unknown unit.
pub fn tof_unit_conversion(dataset: &Dataset) -> Result<f64> {
    let Ok(attr) = dataset.attr("units") else {
        return Ok(1.0);
    };
    let label: VarLenUnicode = attr.read_scalar()?;
    match label.to_ascii_lowercase().as_str() {
        "s" | "second" | "seconds" => Ok(1.0e6),
        "ms" | "millisecond" | "milliseconds" => Ok(1.0e3),
        "us" | "microsecond" | "microseconds" => Ok(1.0),
        "ns" | "nanosecond" | "nanoseconds" => Ok(1.0e-3),
        other => Err(Error::InvalidFormat(format!(
            "unrecognized TOF unit: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdf5::File;
    use std::str::FromStr;
    use tempfile::NamedTempFile;

    fn dataset_with_units(file: &File, units: Option<&str>) -> Dataset {
        let dataset = file
            .new_dataset_builder()
            .with_data(&[1.0f32, 2.0])
            .create("event_time_offset")
            .unwrap();
        if let Some(label) = units {
            let value = VarLenUnicode::from_str(label).unwrap();
            dataset
                .new_attr::<VarLenUnicode>()
                .create("units")
                .unwrap()
                .write_scalar(&value)
                .unwrap();
        }
        dataset
    }

    #[test]
    fn known_units_map_to_microseconds() {
        let tmp = NamedTempFile::new().unwrap();
        let file = File::create(tmp.path()).unwrap();

        let us = dataset_with_units(&file, Some("microsecond"));
        assert!((tof_unit_conversion(&us).unwrap() - 1.0).abs() < f64::EPSILON);

        let tmp = NamedTempFile::new().unwrap();
        let file = File::create(tmp.path()).unwrap();
        let ns = dataset_with_units(&file, Some("ns"));
        assert!((tof_unit_conversion(&ns).unwrap() - 1.0e-3).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_units_default_to_microseconds() {
        let tmp = NamedTempFile::new().unwrap();
        let file = File::create(tmp.path()).unwrap();
        let dataset = dataset_with_units(&file, None);
        assert!((tof_unit_conversion(&dataset).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_units_are_rejected() {
        let tmp = NamedTempFile::new().unwrap();
        let file = File::create(tmp.path()).unwrap();
        let dataset = dataset_with_units(&file, Some("furlongs"));
        assert!(matches!(
            tof_unit_conversion(&dataset),
            Err(Error::InvalidFormat(_))
        ));
    }
}
