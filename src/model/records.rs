//! Wire records for plants, beds and images

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Coordinate;

/// Cultivation status code of a plant that is currently in the ground.
pub const CURRENT_STATUS: &str = "C";

/// Resource collections served by the garden data service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Plants,
    Beds,
    Images,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Plants => "plants",
            Collection::Beds => "beds",
            Collection::Images => "images",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plant accession.
///
/// Every botanical property beyond the fields the guide reasons about
/// (`recnum`, `bed`, `accsta`, coordinates) is kept in `properties`, with
/// missing or null values stored as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WirePlant", into = "WirePlant")]
pub struct PlantRecord {
    /// Unique record number
    pub recnum: String,

    /// Whitespace-delimited bed identifiers
    pub bed: String,

    /// Cultivation status code
    pub accsta: String,

    /// Latitude as served (may be absent or empty)
    pub latitude: Option<String>,

    /// Longitude as served (may be absent or empty)
    pub longitude: Option<String>,

    /// Remaining named properties (genus, species, cultivar_name, ...)
    pub properties: BTreeMap<String, String>,
}

impl PlantRecord {
    pub fn new(recnum: impl Into<String>, bed: impl Into<String>, accsta: impl Into<String>) -> Self {
        Self {
            recnum: recnum.into(),
            bed: bed.into(),
            accsta: accsta.into(),
            latitude: None,
            longitude: None,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder-style position setter
    pub fn with_position(mut self, latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        self.latitude = Some(latitude.into());
        self.longitude = Some(longitude.into());
        self
    }

    /// Whether this plant is currently planted
    pub fn is_current(&self) -> bool {
        self.accsta == CURRENT_STATUS
    }

    /// Bed identifiers this plant occupies
    pub fn bed_ids(&self) -> impl Iterator<Item = &str> {
        self.bed.split_whitespace()
    }

    /// Property value, empty when absent
    pub fn property(&self, key: &str) -> &str {
        self.properties.get(key).map(String::as_str).unwrap_or("")
    }

    /// Position of the plant's origin, if both halves parse
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (&self.latitude, &self.longitude) {
            (Some(lat), Some(lon)) => Coordinate::parse(lat, lon),
            _ => None,
        }
    }

    /// All fields as `(label, value)` pairs ordered by field name.
    ///
    /// Labels are title-cased field names: `cultivar_name` becomes
    /// `Cultivar Name`.
    pub fn labelled_values(&self) -> Vec<(String, String)> {
        let mut fields: BTreeMap<&str, &str> = self
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        fields.insert("recnum", &self.recnum);
        fields.insert("bed", &self.bed);
        fields.insert("accsta", &self.accsta);
        fields.insert("latitude", self.latitude.as_deref().unwrap_or(""));
        fields.insert("longitude", self.longitude.as_deref().unwrap_or(""));

        fields
            .into_iter()
            .map(|(k, v)| (field_label(k), v.to_string()))
            .collect()
    }
}

/// Title-case a snake_case field name
pub fn field_label(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A garden bed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub bed_id: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub latitude: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub longitude: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub last_modified: String,
}

impl BedRecord {
    pub fn new(bed_id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            bed_id: bed_id.into(),
            name: name.into(),
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
            last_modified: String::new(),
        }
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::parse(&self.latitude, &self.longitude)
    }
}

/// Image file attached to a plant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub recnum: String,

    #[serde(deserialize_with = "lenient::string")]
    pub img_file_name: String,
}

/// Plant as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WirePlant {
    #[serde(deserialize_with = "lenient::string")]
    recnum: String,

    #[serde(default, deserialize_with = "lenient::string")]
    bed: String,

    #[serde(default, deserialize_with = "lenient::string")]
    accsta: String,

    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    latitude: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    longitude: Option<String>,

    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl From<WirePlant> for PlantRecord {
    fn from(wire: WirePlant) -> Self {
        let properties = wire
            .rest
            .into_iter()
            .map(|(k, v)| (k, lenient::value_to_string(v).unwrap_or_default()))
            .collect();

        Self {
            recnum: wire.recnum,
            bed: wire.bed,
            accsta: wire.accsta,
            latitude: wire.latitude,
            longitude: wire.longitude,
            properties,
        }
    }
}

impl From<PlantRecord> for WirePlant {
    fn from(plant: PlantRecord) -> Self {
        Self {
            recnum: plant.recnum,
            bed: plant.bed,
            accsta: plant.accsta,
            latitude: plant.latitude,
            longitude: plant.longitude,
            rest: plant
                .properties
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        }
    }
}

/// The service is loose about scalar types: numbers and nulls turn up where
/// strings are expected.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn value_to_string(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_to_string(value).unwrap_or_default())
    }

    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(value_to_string))
    }
}
