use serde::{Deserialize, Serialize};

use crate::error::IdCropError;

/// Millimeters per inch.
const MM_PER_INCH: f64 = 25.4;

/// Print resolution used by every [`Standard`] unless overridden.
pub const DEFAULT_DPI: u32 = 300;

/// Highest accepted print resolution.
pub const MAX_DPI: u32 = 2400;

/// Largest accepted output canvas, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 100_000_000;

/// Convert a physical length to whole pixels at `dpi`.
pub fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    (mm / MM_PER_INCH * dpi as f64).round().max(0.0) as u32
}

fn mm_to_px_exact(mm: f64, dpi: u32) -> f64 {
    mm / MM_PER_INCH * dpi as f64
}

/// Physical description of the output photo.
///
/// All lengths are in millimeters. The pixel canvas is derived from them at
/// the configured DPI and never depends on the input image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    /// Photo width (mm).
    pub width_mm: f64,
    /// Photo height (mm).
    pub height_mm: f64,
    /// Target print resolution.
    pub dpi: u32,
    /// Smallest acceptable crown-to-chin height (mm).
    pub head_height_min_mm: f64,
    /// Largest acceptable crown-to-chin height (mm).
    pub head_height_max_mm: f64,
    /// Gap between the photo's top edge and the crown (mm).
    pub top_margin_mm: f64,
}

impl OutputSpec {
    /// Output canvas size in pixels: `round(mm / 25.4 * dpi)` per axis.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            mm_to_px(self.width_mm, self.dpi),
            mm_to_px(self.height_mm, self.dpi),
        )
    }

    /// Pixel height the head is scaled to: the midpoint of the head-height range.
    pub fn target_head_height_px(&self) -> f64 {
        let mid_mm = (self.head_height_min_mm + self.head_height_max_mm) / 2.0;
        mm_to_px_exact(mid_mm, self.dpi)
    }

    /// Pixel row where the crown lands.
    pub fn top_margin_px(&self) -> f64 {
        mm_to_px_exact(self.top_margin_mm, self.dpi)
    }

    /// Same spec at a different print resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Keep the height and derive the width from `ratio` (width / height).
    pub fn with_aspect_ratio(mut self, ratio: f64) -> Self {
        self.width_mm = self.height_mm * ratio;
        self
    }

    /// Check that the spec describes a photo the head can actually fit in.
    pub fn validate(&self) -> Result<(), IdCropError> {
        let lengths = [
            self.width_mm,
            self.height_mm,
            self.head_height_min_mm,
            self.head_height_max_mm,
            self.top_margin_mm,
        ];
        if lengths.iter().any(|v| !v.is_finite()) {
            return Err(IdCropError::InvalidOutputSpec(
                "lengths must be finite".to_string(),
            ));
        }
        if self.width_mm <= 0.0 || self.height_mm <= 0.0 {
            return Err(IdCropError::InvalidOutputSpec(format!(
                "photo size must be positive, got {}x{} mm",
                self.width_mm, self.height_mm
            )));
        }
        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(IdCropError::InvalidOutputSpec(format!(
                "dpi must be between 1 and {MAX_DPI}, got {}",
                self.dpi
            )));
        }
        if self.head_height_min_mm <= 0.0 || self.head_height_min_mm > self.head_height_max_mm {
            return Err(IdCropError::InvalidOutputSpec(format!(
                "head height range {}..{} mm is empty",
                self.head_height_min_mm, self.head_height_max_mm
            )));
        }
        if self.top_margin_mm < 0.0 || self.top_margin_mm + self.head_height_max_mm > self.height_mm
        {
            return Err(IdCropError::InvalidOutputSpec(format!(
                "head ({} mm) plus top margin ({} mm) exceeds photo height ({} mm)",
                self.head_height_max_mm, self.top_margin_mm, self.height_mm
            )));
        }
        let (w, h) = self.pixel_size();
        if w == 0 || h == 0 {
            return Err(IdCropError::InvalidOutputSpec(format!(
                "photo rounds to {w}x{h} px at {} dpi",
                self.dpi
            )));
        }
        if u64::from(w) * u64::from(h) > MAX_CANVAS_PIXELS {
            return Err(IdCropError::InvalidOutputSpec(format!(
                "{w}x{h} px canvas exceeds {MAX_CANVAS_PIXELS} pixels"
            )));
        }
        Ok(())
    }
}

impl Default for OutputSpec {
    fn default() -> Self {
        Standard::default().spec()
    }
}

/// Photo standards for common identity documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Standard {
    /// ICAO passport photo used across the EU, UK and Schengen area.
    ///
    /// - 35×45 mm
    /// - crown to chin 32–36 mm
    #[default]
    #[serde(rename = "icao-35x45")]
    Icao35x45,

    /// United States passport and visa photo.
    ///
    /// - 2×2 in (51×51 mm)
    /// - crown to chin 25–35 mm
    #[serde(rename = "us-2x2")]
    Us2x2,

    /// People's Republic of China passport and visa photo.
    ///
    /// - 33×48 mm
    /// - crown to chin 28–33 mm
    #[serde(rename = "china-33x48")]
    China33x48,

    /// Canadian passport photo.
    ///
    /// - 50×70 mm
    /// - crown to chin 31–36 mm
    #[serde(rename = "canada-50x70")]
    Canada50x70,
}

static STANDARDS: [Standard; 4] = [
    Standard::Icao35x45,
    Standard::Us2x2,
    Standard::China33x48,
    Standard::Canada50x70,
];

impl Standard {
    /// All built-in standards.
    pub fn all() -> &'static [Standard] {
        &STANDARDS
    }

    /// Stable identifier used by the CLI and the wasm options.
    pub fn name(self) -> &'static str {
        match self {
            Standard::Icao35x45 => "icao-35x45",
            Standard::Us2x2 => "us-2x2",
            Standard::China33x48 => "china-33x48",
            Standard::Canada50x70 => "canada-50x70",
        }
    }

    /// Short description for tooling.
    pub fn description(self) -> &'static str {
        match self {
            Standard::Icao35x45 => "ICAO passport photo, EU/UK/Schengen (35×45 mm)",
            Standard::Us2x2 => "US passport and visa photo (2×2 in)",
            Standard::China33x48 => "China passport and visa photo (33×48 mm)",
            Standard::Canada50x70 => "Canadian passport photo (50×70 mm)",
        }
    }

    /// The physical output spec at [`DEFAULT_DPI`].
    pub fn spec(self) -> OutputSpec {
        let (width_mm, height_mm, head_min, head_max, top) = match self {
            Standard::Icao35x45 => (35.0, 45.0, 32.0, 36.0, 4.0),
            Standard::Us2x2 => (50.8, 50.8, 25.4, 34.9, 6.0),
            Standard::China33x48 => (33.0, 48.0, 28.0, 33.0, 4.0),
            Standard::Canada50x70 => (50.0, 70.0, 31.0, 36.0, 10.0),
        };
        OutputSpec {
            width_mm,
            height_mm,
            dpi: DEFAULT_DPI,
            head_height_min_mm: head_min,
            head_height_max_mm: head_max,
            top_margin_mm: top,
        }
    }
}

/// Find a standard by name, ignoring case and punctuation.
pub fn standard_by_name(name: &str) -> Option<Standard> {
    let key = normalize_name(name);
    Standard::all()
        .iter()
        .copied()
        .find(|s| normalize_name(s.name()) == key)
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icao_pixel_size_at_300_dpi() {
        // 35 / 25.4 * 300 = 413.39, 45 / 25.4 * 300 = 531.50 (just under)
        assert_eq!(Standard::Icao35x45.spec().pixel_size(), (413, 531));
    }

    #[test]
    fn us_pixel_size_at_300_dpi() {
        assert_eq!(Standard::Us2x2.spec().pixel_size(), (600, 600));
    }

    #[test]
    fn pixel_size_follows_dpi() {
        let spec = Standard::Icao35x45.spec().with_dpi(600);
        assert_eq!(spec.pixel_size(), (827, 1063));
    }

    #[test]
    fn target_head_height_is_range_midpoint() {
        let spec = Standard::Icao35x45.spec();
        let expected = 34.0 / 25.4 * 300.0;
        assert!((spec.target_head_height_px() - expected).abs() < 1e-9);
    }

    #[test]
    fn aspect_ratio_keeps_height() {
        let spec = Standard::Icao35x45.spec().with_aspect_ratio(1.0);
        assert_eq!(spec.width_mm, 45.0);
        assert_eq!(spec.pixel_size(), (531, 531));
    }

    #[test]
    fn builtin_standards_validate() {
        for standard in Standard::all() {
            standard
                .spec()
                .validate()
                .unwrap_or_else(|e| panic!("{}: {e}", standard.name()));
        }
    }

    #[test]
    fn head_taller_than_photo_is_invalid() {
        let mut spec = Standard::Icao35x45.spec();
        spec.head_height_max_mm = 44.0;
        assert!(matches!(
            spec.validate(),
            Err(IdCropError::InvalidOutputSpec(_))
        ));
    }

    #[test]
    fn zero_dpi_is_invalid() {
        let spec = Standard::Icao35x45.spec().with_dpi(0);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn dpi_above_limit_is_invalid() {
        assert!(Standard::Canada50x70.spec().with_dpi(MAX_DPI).validate().is_ok());
        for dpi in [MAX_DPI + 1, u32::MAX] {
            let err = Standard::Icao35x45.spec().with_dpi(dpi).validate().unwrap_err();
            assert!(matches!(err, IdCropError::InvalidOutputSpec(_)), "{dpi}");
        }
    }

    #[test]
    fn oversized_custom_photo_is_invalid() {
        let mut spec = Standard::Icao35x45.spec();
        spec.width_mm = 5_000.0;
        spec.height_mm = 5_000.0;
        assert!(matches!(
            spec.validate(),
            Err(IdCropError::InvalidOutputSpec(msg)) if msg.contains("exceeds")
        ));
    }

    #[test]
    fn inverted_head_range_is_invalid() {
        let mut spec = Standard::Us2x2.spec();
        spec.head_height_min_mm = 40.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn lookup_ignores_case_and_punctuation() {
        assert_eq!(standard_by_name("ICAO 35x45"), Some(Standard::Icao35x45));
        assert_eq!(standard_by_name("us_2x2"), Some(Standard::Us2x2));
        assert_eq!(standard_by_name("canada-50x70"), Some(Standard::Canada50x70));
        assert_eq!(standard_by_name("mars-1x1"), None);
    }

    #[test]
    fn names_round_trip_through_lookup() {
        for standard in Standard::all() {
            assert_eq!(standard_by_name(standard.name()), Some(*standard));
        }
    }
}
