use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Car plates: two or three letters, optional space, three digits, then up to
/// two trailing letters (e.g. "AB123", "ABC 123XY").
const CAR_PATTERN: &str = r"^[A-Z]{2,3}\s?[0-9]{3}([A-Z]{0,2})?$";

/// Motorcycle plates: three digits + three letters, or one letter + three
/// digits + three letters, with an optional space before the letters
/// (e.g. "123ABC", "A123 ABC").
const MOTORCYCLE_PATTERN: &str = r"^[0-9]{3}\s?[A-Z]{3}$|^[A-Z][0-9]{3}\s?[A-Z]{3}$";

static CAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CAR_PATTERN).expect("car plate pattern is valid"));

static MOTORCYCLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MOTORCYCLE_PATTERN).expect("motorcycle plate pattern is valid"));

/// Recognized plate conventions.
///
/// The variants are mutually exclusive: car plates start with at least two
/// letters, motorcycle plates with a digit or a single letter followed by a
/// digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlateFormat {
    Car,
    Motorcycle,
}

impl PlateFormat {
    /// Every known format, in matching order.
    pub const ALL: [PlateFormat; 2] = [PlateFormat::Car, PlateFormat::Motorcycle];

    /// Returns true if `text` matches this format exactly.
    pub fn matches(self, text: &str) -> bool {
        match self {
            Self::Car => is_car_plate(text),
            Self::Motorcycle => is_motorcycle_plate(text),
        }
    }

    /// Returns the format `text` belongs to, if any.
    pub fn classify(text: &str) -> Option<PlateFormat> {
        Self::ALL.into_iter().find(|format| format.matches(text))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
        }
    }
}

impl fmt::Display for PlateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn is_car_plate(text: &str) -> bool {
    CAR_REGEX.is_match(text)
}

fn is_motorcycle_plate(text: &str) -> bool {
    MOTORCYCLE_REGEX.is_match(text)
}

/// Returns true if `text` is a valid plate in any known format.
pub fn validate_plate_format(text: &str) -> bool {
    PlateFormat::classify(text).is_some()
}

/// Normalizes operator-typed text: trims whitespace and uppercases.
pub fn normalize_manual_input(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Picks the first valid plate out of raw OCR text.
///
/// The text is split on line breaks and each line trimmed; lines that do not
/// match a format are dropped. Returns the first survivor in original order.
pub fn first_valid_plate(ocr_text: &str) -> Option<(String, PlateFormat)> {
    ocr_text
        .lines()
        .map(str::trim)
        .find_map(|line| PlateFormat::classify(line).map(|format| (line.to_string(), format)))
}
