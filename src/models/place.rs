//! Place records as returned by the search index.

use geo::Point;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// A name entry: either one display string or an ordered alias list.
///
/// Anything else the index hands back is kept verbatim under `Malformed`
/// and contributes no tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameValue {
    Single(String),
    Aliases(Vec<String>),
    Malformed(Value),
}

impl NameValue {
    /// Every alias in this entry, in order
    pub fn aliases(&self) -> &[String] {
        match self {
            NameValue::Single(name) => std::slice::from_ref(name),
            NameValue::Aliases(names) => names,
            NameValue::Malformed(_) => &[],
        }
    }
}

/// Ancestor identifier stored under a `parent.<layer>_id` key.
///
/// whosonfirst documents use numbers, other importers write strings or
/// single-element arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentId {
    Text(String),
    Number(serde_json::Number),
    List(Vec<ParentId>),
    Malformed(Value),
}

impl ParentId {
    /// Flatten into comparable identifier strings (`4` and `"4"` compare equal)
    pub fn identifiers(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut Vec<String>) {
        match self {
            ParentId::Text(id) => {
                let id = id.trim();
                if !id.is_empty() {
                    out.push(id.to_string());
                }
            }
            ParentId::Number(id) => out.push(number_identifier(id)),
            ParentId::List(ids) => ids.iter().for_each(|id| id.collect_into(out)),
            ParentId::Malformed(_) => {}
        }
    }
}

/// `85633793.0` and `85633793` name the same id
fn number_identifier(id: &serde_json::Number) -> String {
    match id.as_f64() {
        Some(value) if id.is_f64() && value.fract() == 0.0 && value.abs() < 9.0e15 => {
            format!("{}", value as i64)
        }
        _ => id.to_string(),
    }
}

impl From<&str> for ParentId {
    fn from(id: &str) -> Self {
        ParentId::Text(id.to_string())
    }
}

impl From<i64> for ParentId {
    fn from(id: i64) -> Self {
        ParentId::Number(id.into())
    }
}

impl From<i32> for ParentId {
    fn from(id: i32) -> Self {
        ParentId::Number(id.into())
    }
}

/// Center point (lon/lat)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterPoint {
    pub lon: f64,
    pub lat: f64,
}

impl CenterPoint {
    /// Convert to a `geo::Point`, rejecting non-finite or out-of-range coordinates
    pub fn to_point(&self) -> Option<Point<f64>> {
        let valid = self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat);
        valid.then(|| Point::new(self.lon, self.lat))
    }
}

/// Structured address fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressParts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl AddressParts {
    /// Postal code, read from `zip` or a `postcode` field
    pub fn postal_code(&self) -> Option<&str> {
        self.zip
            .as_deref()
            .or_else(|| self.other.get("postcode").and_then(Value::as_str))
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// One search hit.
///
/// Only the fields the deduplicator reads are typed; everything else is
/// carried in `extra` so a surviving record serializes back unchanged.
/// A typed field whose value has the wrong shape is left in `extra`
/// verbatim and its typed slot stays empty, so one bad record never
/// fails the page it arrives in.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRecord {
    /// Originating dataset, e.g. "whosonfirst"
    pub source: String,

    /// Identifier within the source
    pub source_id: String,

    /// Layer name; canonical or a configured curated layer
    pub layer: Option<String>,

    /// Names by language tag: {"default": "...", "eng": [...]}
    pub name: Option<HashMap<String, NameValue>>,

    /// Ancestor ids keyed `<layer>_id`, including the record's own layer
    pub parent: Option<HashMap<String, ParentId>>,

    pub center_point: Option<CenterPoint>,

    pub address_parts: Option<AddressParts>,

    pub extra: Map<String, Value>,
}

const SOURCE: &str = "source";
const SOURCE_ID: &str = "source_id";
const LAYER: &str = "layer";
const NAME: &str = "name";
const PARENT: &str = "parent";
const CENTER_POINT: &str = "center_point";
const ADDRESS_PARTS: &str = "address_parts";

/// Move `key` out of `fields` if it parses as `T`; otherwise leave it there
fn take_field<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let raw = fields.remove(key)?;
    match T::deserialize(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("Keeping malformed '{}' verbatim: {}", key, err);
            fields.insert(key.to_string(), raw);
            None
        }
    }
}

impl<'de> Deserialize<'de> for PlaceRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(PlaceRecord::from_fields(fields))
    }
}

impl Serialize for PlaceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        if self.typed_field_set(SOURCE) {
            map.serialize_entry(SOURCE, &self.source)?;
        }
        if self.typed_field_set(SOURCE_ID) {
            map.serialize_entry(SOURCE_ID, &self.source_id)?;
        }
        if let Some(layer) = &self.layer {
            map.serialize_entry(LAYER, layer)?;
        }
        if let Some(name) = &self.name {
            map.serialize_entry(NAME, name)?;
        }
        if let Some(parent) = &self.parent {
            map.serialize_entry(PARENT, parent)?;
        }
        if let Some(center_point) = &self.center_point {
            map.serialize_entry(CENTER_POINT, center_point)?;
        }
        if let Some(address_parts) = &self.address_parts {
            map.serialize_entry(ADDRESS_PARTS, address_parts)?;
        }

        for (key, value) in &self.extra {
            if !self.typed_field_set(key) {
                map.serialize_entry(key, value)?;
            }
        }

        map.end()
    }
}

impl PlaceRecord {
    /// Build a record from a JSON object, never failing on field shapes
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let source = take_field(&mut fields, SOURCE).unwrap_or_default();
        let source_id = take_field(&mut fields, SOURCE_ID).unwrap_or_default();
        let layer = take_field(&mut fields, LAYER);
        let name = take_field(&mut fields, NAME);
        let parent = take_field(&mut fields, PARENT);
        let center_point = take_field(&mut fields, CENTER_POINT);
        let address_parts = take_field(&mut fields, ADDRESS_PARTS);

        Self {
            source,
            source_id,
            layer,
            name,
            parent,
            center_point,
            address_parts,
            extra: fields,
        }
    }

    /// Whether `key` is written from a typed field rather than from `extra`
    fn typed_field_set(&self, key: &str) -> bool {
        match key {
            SOURCE => !self.source.is_empty(),
            SOURCE_ID => !self.source_id.is_empty(),
            LAYER => self.layer.is_some(),
            NAME => self.name.is_some(),
            PARENT => self.parent.is_some(),
            CENTER_POINT => self.center_point.is_some(),
            ADDRESS_PARTS => self.address_parts.is_some(),
            _ => false,
        }
    }

    /// Create a record with only its identity set
    pub fn new(source: &str, source_id: &str) -> Self {
        Self {
            source: source.to_string(),
            source_id: source_id.to_string(),
            layer: None,
            name: None,
            parent: None,
            center_point: None,
            address_parts: None,
            extra: Map::new(),
        }
    }

    /// Global id in the "source:layer:source_id" form used in logs
    pub fn gid(&self) -> String {
        format!(
            "{}:{}:{}",
            self.source,
            self.layer.as_deref().unwrap_or("unknown"),
            self.source_id
        )
    }

    pub fn with_layer(mut self, layer: &str) -> Self {
        self.layer = Some(layer.to_string());
        self
    }

    /// Add a name in a specific language
    pub fn with_name(mut self, lang: &str, name: &str) -> Self {
        self.name
            .get_or_insert_with(HashMap::new)
            .insert(lang.to_string(), NameValue::Single(name.to_string()));
        self
    }

    /// Add an alias list in a specific language
    pub fn with_aliases(mut self, lang: &str, names: &[&str]) -> Self {
        self.name.get_or_insert_with(HashMap::new).insert(
            lang.to_string(),
            NameValue::Aliases(names.iter().map(|n| n.to_string()).collect()),
        );
        self
    }

    /// Set `parent.<layer>_id`
    pub fn with_parent(mut self, layer: &str, id: impl Into<ParentId>) -> Self {
        self.parent
            .get_or_insert_with(HashMap::new)
            .insert(format!("{}_id", layer), id.into());
        self
    }

    pub fn with_center(mut self, lon: f64, lat: f64) -> Self {
        self.center_point = Some(CenterPoint { lon, lat });
        self
    }

    pub fn with_address(mut self, address: AddressParts) -> Self {
        self.address_parts = Some(address);
        self
    }

    pub fn with_postal_code(mut self, zip: &str) -> Self {
        self.address_parts.get_or_insert_with(AddressParts::default).zip = Some(zip.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_variants_deserialize() {
        let record: PlaceRecord = serde_json::from_value(json!({
            "source": "openaddresses",
            "source_id": "1",
            "name": { "default": ["100 Main St", "100 Main Street"], "eng": "100 Main St", "bad": 7 }
        }))
        .unwrap();

        let names = record.name.unwrap();
        assert_eq!(names["default"].aliases().len(), 2);
        assert_eq!(names["eng"].aliases(), ["100 Main St".to_string()]);
        assert!(names["bad"].aliases().is_empty());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = json!({
            "source": "whosonfirst",
            "source_id": "85688481",
            "layer": "region",
            "name": { "default": "Pennsylvania" },
            "parent": { "region_id": 85688481, "country_id": ["85633793"] },
            "center_point": { "lon": -77.6, "lat": 40.9 },
            "confidence": 0.8,
            "bounding_box": "{\"min_lat\":39.7}",
            "address_parts": { "zip": "17602", "county": "Lancaster" }
        });

        let record: PlaceRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.extra["confidence"], json!(0.8));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn test_parent_identifiers_flatten() {
        assert_eq!(ParentId::from(4).identifiers(), vec!["4"]);
        assert_eq!(ParentId::from(" 4 ").identifiers(), vec!["4"]);
        let list = ParentId::List(vec![ParentId::from(1), ParentId::from("2")]);
        assert_eq!(list.identifiers(), vec!["1", "2"]);
        assert!(ParentId::Malformed(Value::Null).identifiers().is_empty());
    }

    #[test]
    fn test_integral_float_ids_normalized() {
        let float: ParentId = serde_json::from_value(json!(85633793.0)).unwrap();
        assert_eq!(float.identifiers(), vec!["85633793"]);

        let fractional: ParentId = serde_json::from_value(json!(1.5)).unwrap();
        assert_eq!(fractional.identifiers(), vec!["1.5"]);
    }

    #[test]
    fn test_malformed_fields_kept_verbatim() {
        let raw = json!({
            "source": "openaddresses",
            "source_id": 17,
            "layer": 7,
            "name": "X",
            "center_point": { "lon": "7.0", "lat": "43.55" },
            "address_parts": { "number": "100", "zip": 17602 },
            "parent": { "region_id": 85688481 }
        });

        let record: PlaceRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.source, "openaddresses");
        assert!(record.source_id.is_empty());
        assert!(record.layer.is_none());
        assert!(record.name.is_none());
        assert!(record.center_point.is_none());
        assert!(record.address_parts.is_none());
        assert!(record.parent.is_some());
        assert_eq!(record.extra["layer"], json!(7));

        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn test_null_fields_round_trip() {
        let raw = json!({
            "source": "geonames",
            "source_id": "1",
            "layer": null,
            "center_point": null
        });
        let record: PlaceRecord = serde_json::from_value(raw.clone()).unwrap();
        assert!(record.layer.is_none());
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn test_typed_field_wins_over_stale_extra() {
        let record: PlaceRecord =
            serde_json::from_value(json!({ "source": "geonames", "source_id": "1", "layer": 7 }))
                .unwrap();
        let record = record.with_layer("locality");
        assert_eq!(serde_json::to_value(&record).unwrap()["layer"], json!("locality"));
    }

    #[test]
    fn test_center_point_validation() {
        assert!(CenterPoint { lon: 7.02, lat: 43.55 }.to_point().is_some());
        assert!(CenterPoint { lon: f64::NAN, lat: 43.55 }.to_point().is_none());
        assert!(CenterPoint { lon: 7.02, lat: f64::INFINITY }.to_point().is_none());
        assert!(CenterPoint { lon: 200.0, lat: 0.0 }.to_point().is_none());
    }

    #[test]
    fn test_postal_code_sources() {
        let zip = AddressParts { zip: Some("54321".into()), ..Default::default() };
        assert_eq!(zip.postal_code(), Some("54321"));

        let mut other = Map::new();
        other.insert("postcode".into(), json!("75001"));
        let postcode = AddressParts { other, ..Default::default() };
        assert_eq!(postcode.postal_code(), Some("75001"));

        let blank = AddressParts { zip: Some("  ".into()), ..Default::default() };
        assert_eq!(blank.postal_code(), None);
    }

    #[test]
    fn test_builders() {
        let record = PlaceRecord::new("geonames", "6446684")
            .with_layer("locality")
            .with_name("default", "Cannes")
            .with_parent("region", 85683323)
            .with_center(7.02, 43.55);

        assert_eq!(record.gid(), "geonames:locality:6446684");
        assert!(record.parent.unwrap().contains_key("region_id"));
    }
}
