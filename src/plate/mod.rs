//! Plate formats and the list of accepted plates.

pub mod format;
pub mod list;

pub use format::{first_valid_plate, normalize_manual_input, validate_plate_format, PlateFormat};
pub use list::{PlateList, PlateOrigin, PlateRecord};
