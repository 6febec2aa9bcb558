pub mod google;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// A single autocomplete suggestion returned by a places provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
  pub place_id: String,
  /// Full human-readable text, e.g. "Berlin, Germany".
  pub description: String,
  pub main_text: String,
  pub secondary_text: Option<String>,
}

impl Prediction {
  /// The text committed into the field when this row is selected.
  #[must_use]
  pub fn full_text(&self) -> &str {
    &self.description
  }
}

impl Display for Prediction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.description)
  }
}

/// Opaque correlation id grouping the autocomplete queries and the
/// eventual detail fetch of one widget lifetime. Created once, never
/// regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(Uuid);

impl SessionToken {
  #[must_use]
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }
}

impl Default for SessionToken {
  fn default() -> Self {
    Self::new()
  }
}

impl Display for SessionToken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.simple())
  }
}

/// Rectangular region used to weight suggestions, degrees WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationBias {
  pub south: f64,
  pub west: f64,
  pub north: f64,
  pub east: f64,
}

impl LocationBias {
  #[must_use]
  pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
    Self {
      south,
      west,
      north,
      east,
    }
  }

  /// Center of the bias rectangle, (lat, lon).
  #[must_use]
  pub fn center(&self) -> (f64, f64) {
    (
      f64::midpoint(self.south, self.north),
      f64::midpoint(self.west, self.east),
    )
  }
}

/// Result-type restriction applied to autocomplete queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TypeFilter {
  #[default]
  Cities,
  Regions,
  Addresses,
  Establishments,
  Geocodes,
}

impl TypeFilter {
  #[must_use]
  pub fn param(&self) -> &'static str {
    match self {
      TypeFilter::Cities => "(cities)",
      TypeFilter::Regions => "(regions)",
      TypeFilter::Addresses => "address",
      TypeFilter::Establishments => "establishment",
      TypeFilter::Geocodes => "geocode",
    }
  }
}

/// A selectable attribute of a place detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceField {
  Id,
  Name,
  Address,
  Location,
  Types,
}

impl PlaceField {
  #[must_use]
  pub fn param(&self) -> &'static str {
    match self {
      PlaceField::Id => "place_id",
      PlaceField::Name => "name",
      PlaceField::Address => "formatted_address",
      PlaceField::Location => "geometry/location",
      PlaceField::Types => "type",
    }
  }

  /// The field set fetched after selection when the host sets none.
  #[must_use]
  pub fn defaults() -> Vec<PlaceField> {
    vec![
      PlaceField::Id,
      PlaceField::Name,
      PlaceField::Address,
      PlaceField::Location,
    ]
  }
}

/// Place detail record; only the requested fields are populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Place {
  pub place_id: Option<String>,
  pub name: Option<String>,
  pub address: Option<String>,
  /// (lat, lon) in degrees.
  pub location: Option<(f64, f64)>,
  pub types: Vec<String>,
}

/// One autocomplete query. Built fresh per keystroke from the widget's
/// current configuration; the session token is shared across all of
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionsRequest {
  pub query: String,
  pub country: Option<String>,
  pub location_bias: Option<LocationBias>,
  pub type_filter: TypeFilter,
  pub session_token: SessionToken,
}

impl PredictionsRequest {
  #[must_use]
  pub fn new(query: impl Into<String>, session_token: SessionToken) -> Self {
    Self {
      query: query.into(),
      country: None,
      location_bias: None,
      type_filter: TypeFilter::default(),
      session_token,
    }
  }

  #[must_use]
  pub fn with_country(mut self, country: Option<String>) -> Self {
    self.country = country;
    self
  }

  #[must_use]
  pub fn with_location_bias(mut self, bias: Option<LocationBias>) -> Self {
    self.location_bias = bias;
    self
  }

  #[must_use]
  pub fn with_type_filter(mut self, filter: TypeFilter) -> Self {
    self.type_filter = filter;
    self
  }
}

/// Trait for place-autocomplete backends.
#[async_trait::async_trait]
pub trait PlacesClient: Send + Sync {
  /// Human-readable name of the provider.
  fn name(&self) -> &str;

  /// Fetch predictions for a text fragment.
  async fn find_predictions(&self, request: &PredictionsRequest) -> Result<Vec<Prediction>>;

  /// Fetch the detail record of one place, restricted to `fields`.
  async fn fetch_place(&self, place_id: &str, fields: &[PlaceField]) -> Result<Place>;
}

/// Configuration for places providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlacesClientConfig {
  /// Google Places web API.
  Google {
    api_key: String,
    base_url: Option<String>,
  },
  /// Custom geocoding endpoint returning a Google-compatible payload.
  Custom {
    name: String,
    url_template: String,
    headers: Option<std::collections::HashMap<String, String>>,
  },
}
