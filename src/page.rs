//! Page model handed to the document exporter: media size, margins,
//! orientation and resolution.
//!
//! Dimensions are kept in mils (thousandths of an inch), the unit print
//! exporters usually work in. Millimetre helpers convert at the edges.

use serde::{Deserialize, Serialize};

/// Mils per millimetre.
pub const MILS_PER_MM: f32 = 39.3701;

/// Default resolution in dots per inch.
pub const DEFAULT_DPI: u32 = 600;

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// A named media size in mils.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub id: String,
    pub width_mils: u32,
    pub height_mils: u32,
}

impl PageSize {
    pub fn new(id: impl Into<String>, width_mils: u32, height_mils: u32) -> Self {
        Self {
            id: id.into(),
            width_mils,
            height_mils,
        }
    }

    /// ISO A3, 297 × 420 mm.
    pub fn iso_a3() -> Self {
        Self::new("ISO_A3", 11690, 16540)
    }

    /// ISO A4, 210 × 297 mm (default).
    pub fn iso_a4() -> Self {
        Self::new("ISO_A4", 8270, 11690)
    }

    /// ISO A5, 148 × 210 mm.
    pub fn iso_a5() -> Self {
        Self::new("ISO_A5", 5830, 8270)
    }

    /// US Letter, 8.5 × 11 in.
    pub fn na_letter() -> Self {
        Self::new("NA_LETTER", 8500, 11000)
    }

    /// US Legal, 8.5 × 14 in.
    pub fn na_legal() -> Self {
        Self::new("NA_LEGAL", 8500, 14000)
    }

    /// Look up a well-known size by a loose name (`a4`, `ISO_A4`, `letter`).
    pub fn from_name(name: &str) -> Option<Self> {
        let key = name.trim().to_ascii_lowercase();
        let key = key
            .trim_start_matches("iso_")
            .trim_start_matches("na_");
        match key {
            "a3" => Some(Self::iso_a3()),
            "a4" => Some(Self::iso_a4()),
            "a5" => Some(Self::iso_a5()),
            "letter" => Some(Self::na_letter()),
            "legal" => Some(Self::na_legal()),
            _ => None,
        }
    }

    pub fn is_portrait(&self) -> bool {
        self.width_mils <= self.height_mils
    }

    /// The same size with the long edge horizontal.
    pub fn as_landscape(&self) -> Self {
        if self.is_portrait() {
            Self::new(self.id.clone(), self.height_mils, self.width_mils)
        } else {
            self.clone()
        }
    }

    /// The same size with the long edge vertical.
    pub fn as_portrait(&self) -> Self {
        if self.is_portrait() {
            self.clone()
        } else {
            Self::new(self.id.clone(), self.height_mils, self.width_mils)
        }
    }

    /// Apply an orientation, swapping dimensions when needed.
    pub fn oriented(&self, orientation: PageOrientation) -> Self {
        match orientation {
            PageOrientation::Portrait => self.as_portrait(),
            PageOrientation::Landscape => self.as_landscape(),
        }
    }

    pub fn width_mm(&self) -> f32 {
        mils_to_mm(self.width_mils)
    }

    pub fn height_mm(&self) -> f32 {
        mils_to_mm(self.height_mils)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::iso_a4()
    }
}

/// Minimum page margins in mils.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Margins {
    pub const NONE: Margins = Margins {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// Convert millimetre margins to mils, truncating toward zero.
    /// Negative inputs clamp to zero.
    pub fn from_mm(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: mm_to_mils(left),
            top: mm_to_mils(top),
            right: mm_to_mils(right),
            bottom: mm_to_mils(bottom),
        }
    }

    /// Margins in millimetres, in `[left, top, right, bottom]` order.
    pub fn to_mm(&self) -> [f32; 4] {
        [
            mils_to_mm(self.left),
            mils_to_mm(self.top),
            mils_to_mm(self.right),
            mils_to_mm(self.bottom),
        ]
    }
}

/// Everything the exporter needs to paginate a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintAttributes {
    /// Media size with orientation already applied.
    pub media_size: PageSize,
    pub resolution_dpi: u32,
    pub margins: Margins,
}

impl Default for PrintAttributes {
    fn default() -> Self {
        Self {
            media_size: PageSize::default(),
            resolution_dpi: DEFAULT_DPI,
            margins: Margins::NONE,
        }
    }
}

impl PrintAttributes {
    /// Serialise to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn mm_to_mils(mm: f32) -> u32 {
    (mm.max(0.0) * MILS_PER_MM) as u32
}

fn mils_to_mm(mils: u32) -> f32 {
    mils as f32 / MILS_PER_MM
}
