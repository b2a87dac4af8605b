//! Tunable tables for matching and winner selection.
//!
//! `DedupeConfig` is what operators write (TOML); `Policy` is the validated,
//! immutable lookup form the engine reads.

use anyhow::{Context, Result};
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::models::Layer;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("proximity radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),
    #[error("layer '{0}' appears more than once in layers.preference")]
    DuplicateLayerPreference(Layer),
    #[error("source '{0}' appears more than once in sources.trust")]
    DuplicateSource(String),
    #[error("curated layer '{0}' shadows a canonical layer")]
    CuratedShadowsCanonical(String),
    #[error("curated layer name must not be empty")]
    EmptyCuratedLayer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    pub proximity: ProximityConfig,
    pub layers: LayerConfig,
    pub sources: SourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Max great-circle distance for `dedupe=geo` merges
    pub radius_meters: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            radius_meters: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Coarsest layer of the fine tier; same-layer pairs at or below it need
    /// extra confirmation before merging
    pub fine_tier_floor: Layer,

    /// Winner-selection ranking, most preferred first
    pub preference: Vec<Layer>,

    /// Custom layer name -> canonical layer it stands in for
    pub curated: std::collections::HashMap<String, Layer>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            fine_tier_floor: Layer::Locality,
            preference: vec![
                Layer::Venue,
                Layer::Address,
                Layer::Street,
                Layer::PostalCode,
                Layer::Locality,
                Layer::LocalAdmin,
                Layer::Borough,
                Layer::MacroHood,
                Layer::Neighbourhood,
                Layer::County,
                Layer::MacroCounty,
                Layer::Region,
                Layer::MacroRegion,
                Layer::Dependency,
                Layer::Country,
                Layer::Continent,
            ],
            curated: std::collections::HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source trust order, most trusted first; unlisted sources rank last
    pub trust: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            trust: ["openaddresses", "openstreetmap", "whosonfirst", "geonames"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DedupeConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read dedupe config file")?;
        let config: DedupeConfig =
            toml::from_str(&content).context("Failed to parse dedupe config file")?;
        Ok(config)
    }

    /// Validate and compile into lookup tables
    pub fn compile(&self) -> std::result::Result<Policy, ConfigError> {
        let radius = self.proximity.radius_meters;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ConfigError::InvalidRadius(radius));
        }

        let mut seen_layers = HashSet::new();
        for layer in &self.layers.preference {
            if !seen_layers.insert(*layer) {
                return Err(ConfigError::DuplicateLayerPreference(*layer));
            }
        }
        let layer_rank = rank_table(self.layers.preference.iter().copied());

        let mut seen_sources = HashSet::new();
        for source in &self.sources.trust {
            if !seen_sources.insert(source.trim().to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateSource(source.clone()));
            }
        }
        let trust_rank = rank_table(self.sources.trust.iter().map(|s| s.trim().to_ascii_lowercase()));

        let mut curated = HashMap::new();
        for (name, canonical) in &self.layers.curated {
            let key = name.trim().to_ascii_lowercase();
            if key.is_empty() {
                return Err(ConfigError::EmptyCuratedLayer);
            }
            if key.parse::<Layer>().is_ok() {
                return Err(ConfigError::CuratedShadowsCanonical(name.clone()));
            }
            curated.insert(key, *canonical);
        }

        Ok(Policy {
            radius_meters: radius,
            fine_tier_floor: self.layers.fine_tier_floor,
            layer_rank,
            trust_rank,
            curated,
        })
    }
}

/// Rank entries so the first one scores highest; unlisted entries score 0
fn rank_table<K, I>(entries: I) -> HashMap<K, usize>
where
    K: std::hash::Hash + Eq,
    I: ExactSizeIterator<Item = K>,
{
    let len = entries.len();
    entries.enumerate().map(|(i, key)| (key, len - i)).collect()
}

/// How a record's `layer` string resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerClass {
    /// Canonical layer used for matching and specificity
    pub canonical: Layer,
    /// Whether the record sits in a configured curated layer
    pub curated: bool,
}

/// Validated configuration, immutable for the engine's lifetime
#[derive(Debug, Clone)]
pub struct Policy {
    radius_meters: f64,
    fine_tier_floor: Layer,
    layer_rank: HashMap<Layer, usize>,
    trust_rank: HashMap<String, usize>,
    curated: HashMap<String, Layer>,
}

impl Default for Policy {
    fn default() -> Self {
        match DedupeConfig::default().compile() {
            Ok(policy) => policy,
            Err(err) => unreachable!("default dedupe config is invalid: {}", err),
        }
    }
}

impl Policy {
    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Whether same-layer matches at this layer need extra confirmation
    pub fn is_fine_tier(&self, layer: Layer) -> bool {
        layer >= self.fine_tier_floor
    }

    /// Resolve a raw layer name; `None` means unrecognized
    pub fn classify(&self, raw: &str) -> Option<LayerClass> {
        if let Ok(canonical) = raw.parse::<Layer>() {
            return Some(LayerClass {
                canonical,
                curated: false,
            });
        }
        self.curated
            .get(raw.trim().to_ascii_lowercase().as_str())
            .map(|canonical| LayerClass {
                canonical: *canonical,
                curated: true,
            })
    }

    pub fn layer_rank(&self, layer: Layer) -> usize {
        self.layer_rank.get(&layer).copied().unwrap_or(0)
    }

    pub fn trust_rank(&self, source: &str) -> usize {
        self.trust_rank
            .get(source.trim().to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(0)
    }
}
