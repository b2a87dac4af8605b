//! Place layers and their specificity ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical place layer.
///
/// Variants are declared from coarsest to finest, so the derived `Ord`
/// is the specificity order used by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Continent,
    Country,
    Dependency,
    MacroRegion,
    Region,
    MacroCounty,
    County,
    LocalAdmin,
    Locality,
    Borough,
    MacroHood,
    Neighbourhood,
    PostalCode,
    Street,
    Address,
    Venue,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown layer '{0}'")]
pub struct UnknownLayer(pub String);

impl Layer {
    /// All layers, coarsest first
    pub fn all() -> &'static [Layer] {
        &[
            Layer::Continent,
            Layer::Country,
            Layer::Dependency,
            Layer::MacroRegion,
            Layer::Region,
            Layer::MacroCounty,
            Layer::County,
            Layer::LocalAdmin,
            Layer::Locality,
            Layer::Borough,
            Layer::MacroHood,
            Layer::Neighbourhood,
            Layer::PostalCode,
            Layer::Street,
            Layer::Address,
            Layer::Venue,
        ]
    }

    /// Get the field name for this layer, as used in `layer` and `parent.<layer>_id`
    pub fn field_name(&self) -> &'static str {
        match self {
            Layer::Continent => "continent",
            Layer::Country => "country",
            Layer::Dependency => "dependency",
            Layer::MacroRegion => "macroregion",
            Layer::Region => "region",
            Layer::MacroCounty => "macrocounty",
            Layer::County => "county",
            Layer::LocalAdmin => "localadmin",
            Layer::Locality => "locality",
            Layer::Borough => "borough",
            Layer::MacroHood => "macrohood",
            Layer::Neighbourhood => "neighbourhood",
            Layer::PostalCode => "postalcode",
            Layer::Street => "street",
            Layer::Address => "address",
            Layer::Venue => "venue",
        }
    }

    /// Administrative layers that may describe the same place at different
    /// granularities (country through neighbourhood). Continent is excluded.
    pub fn is_admin(&self) -> bool {
        (Layer::Country..=Layer::Neighbourhood).contains(self)
    }

    /// Whether two layers are interchangeable for duplicate matching
    pub fn is_synonymous(&self, other: Layer) -> bool {
        *self == other || (self.is_admin() && other.is_admin())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for Layer {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Layer::all()
            .iter()
            .copied()
            .find(|layer| layer.field_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLayer(s.to_string()))
    }
}
