//! Product variant axes: color, size, and the variant key.
//!
//! A cart line is identified by its [`VariantKey`] - the (product,
//! color, size) tuple. Adding the same key twice merges quantities
//! instead of creating a second line.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Error for an unrecognized color or size value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {axis}: {value}")]
pub struct VariantParseError {
    /// Which axis failed to parse (`"color"` or `"size"`).
    pub axis: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Garment colors offered by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
    Red,
    Blue,
    Green,
    Yellow,
    Navy,
    Gray,
}

impl Color {
    /// All colors, in display order.
    pub const ALL: [Self; 8] = [
        Self::Black,
        Self::White,
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Navy,
        Self::Gray,
    ];
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Black => "black",
            Self::White => "white",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Navy => "navy",
            Self::Gray => "gray",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Color {
    type Err = VariantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "black" => Ok(Self::Black),
            "white" => Ok(Self::White),
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "navy" => Ok(Self::Navy),
            "gray" => Ok(Self::Gray),
            _ => Err(VariantParseError {
                axis: "color",
                value: s.to_owned(),
            }),
        }
    }
}

/// Garment sizes offered by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
}

impl Size {
    /// All sizes, smallest first.
    pub const ALL: [Self; 6] = [Self::Xs, Self::S, Self::M, Self::L, Self::Xl, Self::Xxl];
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Xs => "xs",
            Self::S => "s",
            Self::M => "m",
            Self::L => "l",
            Self::Xl => "xl",
            Self::Xxl => "xxl",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Size {
    type Err = VariantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xs" => Ok(Self::Xs),
            "s" => Ok(Self::S),
            "m" => Ok(Self::M),
            "l" => Ok(Self::L),
            "xl" => Ok(Self::Xl),
            "xxl" => Ok(Self::Xxl),
            _ => Err(VariantParseError {
                axis: "size",
                value: s.to_owned(),
            }),
        }
    }
}

/// The identity of a purchasable cart line: one product in one color
/// and one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub product: ProductId,
    pub color: Color,
    pub size: Size,
}

impl VariantKey {
    /// Create a variant key.
    #[must_use]
    pub const fn new(product: ProductId, color: Color, size: Size) -> Self {
        Self {
            product,
            color,
            size,
        }
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.product, self.color, self.size)
    }
}
