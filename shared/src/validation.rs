//! Validation utilities for PocketFarm garden data

use rust_decimal::Decimal;

use crate::models::{CareProfile, CropScheduleRecord};
use crate::types::GpsCoordinates;

pub const MAX_CROP_NAME_LENGTH: usize = 100;

// ============================================================================
// Crop Validations
// ============================================================================

/// Validate a crop name (non-blank, at most 100 characters)
pub fn validate_crop_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Crop name cannot be empty");
    }
    if trimmed.chars().count() > MAX_CROP_NAME_LENGTH {
        return Err("Crop name must be at most 100 characters");
    }
    Ok(())
}

/// Validate a care frequency in days
pub fn validate_frequency(days: u32) -> Result<(), &'static str> {
    if days == 0 {
        return Err("Care frequency must be at least 1 day");
    }
    Ok(())
}

/// Validate a crop care profile
pub fn validate_care_profile(profile: &CareProfile) -> Result<(), &'static str> {
    validate_frequency(profile.watering_frequency_days)?;
    validate_frequency(profile.fertilization_frequency_days)
}

/// Validate a schedule record before it is stored or displayed
pub fn validate_record(record: &CropScheduleRecord) -> Result<(), &'static str> {
    validate_crop_name(&record.crop_name)?;
    validate_frequency(record.watering_frequency_days)?;
    validate_frequency(record.fertilization_frequency_days)?;
    if let Some(last) = record.last_watered {
        if record.next_watering < last {
            return Err("Next watering cannot be before the last watering");
        }
    }
    Ok(())
}

// ============================================================================
// Location Validations
// ============================================================================

/// Validate GPS coordinates
pub fn validate_coordinates(coords: &GpsCoordinates) -> Result<(), &'static str> {
    if coords.latitude < Decimal::from(-90) || coords.latitude > Decimal::from(90) {
        return Err("Latitude must be between -90 and 90");
    }
    if coords.longitude < Decimal::from(-180) || coords.longitude > Decimal::from(180) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> CropScheduleRecord {
        CropScheduleRecord {
            crop_name: "Basil".to_string(),
            last_watered: NaiveDate::from_ymd_opt(2024, 5, 1),
            growing_time_days: 60,
            watering_frequency_days: 2,
            fertilization_frequency_days: 14,
            next_watering: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            watered: false,
        }
    }

    #[test]
    fn test_validate_crop_name() {
        assert!(validate_crop_name("Tomato").is_ok());
        assert!(validate_crop_name("   ").is_err());
        assert!(validate_crop_name("").is_err());
        assert!(validate_crop_name(&"a".repeat(100)).is_ok());
        assert!(validate_crop_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_frequency() {
        assert!(validate_frequency(1).is_ok());
        assert!(validate_frequency(0).is_err());
    }

    #[test]
    fn test_validate_record() {
        assert!(validate_record(&record()).is_ok());

        let mut zero = record();
        zero.watering_frequency_days = 0;
        assert!(validate_record(&zero).is_err());

        let mut backwards = record();
        backwards.next_watering = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        assert!(validate_record(&backwards).is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(&GpsCoordinates::new(Decimal::from(18), Decimal::from(98))).is_ok());
        assert!(validate_coordinates(&GpsCoordinates::new(Decimal::from(91), Decimal::from(0))).is_err());
        assert!(validate_coordinates(&GpsCoordinates::new(Decimal::from(0), Decimal::from(-181))).is_err());
    }
}
