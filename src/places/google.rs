use super::{Place, PlaceField, PlacesClient, Prediction, PredictionsRequest};
use anyhow::{Result, anyhow};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const USER_AGENT: &str = "placefield/0.1 (https://github.com/placefield/placefield)";

#[derive(Error, Debug)]
pub enum PlacesError {
  #[error("places API returned status {status}: {message}")]
  Status { status: String, message: String },
  #[error("places API payload is missing field {0}")]
  Payload(&'static str),
}

/// Google Places web API provider (autocomplete + details endpoints).
pub struct GooglePlacesProvider {
  base_url: String,
  api_key: String,
  client: surf::Client,
}

impl GooglePlacesProvider {
  #[must_use]
  pub fn new(api_key: String, base_url: Option<String>) -> Self {
    Self {
      base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
      api_key,
      client: surf::Client::new(),
    }
  }

  fn autocomplete_url(&self, request: &PredictionsRequest) -> String {
    let mut url = format!(
      "{}/autocomplete/json?input={}&types={}&sessiontoken={}&key={}",
      self.base_url,
      urlencoding::encode(&request.query),
      urlencoding::encode(request.type_filter.param()),
      request.session_token,
      self.api_key,
    );

    if let Some(country) = &request.country {
      url.push_str(&format!(
        "&components=country%3A{}",
        urlencoding::encode(country)
      ));
    }

    if let Some(bias) = &request.location_bias {
      let (lat, lon) = bias.center();
      url.push_str(&format!(
        "&location={lat},{lon}&radius={}",
        bias_radius_meters(bias)
      ));
    }

    url
  }

  fn details_url(&self, place_id: &str, fields: &[PlaceField]) -> String {
    let fields = fields
      .iter()
      .map(|f| f.param())
      .collect::<Vec<_>>()
      .join(",");

    format!(
      "{}/details/json?place_id={}&fields={}&key={}",
      self.base_url,
      urlencoding::encode(place_id),
      urlencoding::encode(&fields),
      self.api_key,
    )
  }
}

#[async_trait::async_trait]
impl PlacesClient for GooglePlacesProvider {
  fn name(&self) -> &'static str {
    "Google Places"
  }

  async fn find_predictions(&self, request: &PredictionsRequest) -> Result<Vec<Prediction>> {
    let url = self.autocomplete_url(request);
    log::debug!("Autocomplete request for '{}'", request.query);

    let response = self
      .client
      .get(&url)
      .header("User-Agent", USER_AGENT)
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("Places autocomplete request failed: {}", e))?;

    Ok(parse_predictions(&response)?)
  }

  async fn fetch_place(&self, place_id: &str, fields: &[PlaceField]) -> Result<Place> {
    let url = self.details_url(place_id, fields);
    log::debug!("Details request for place {place_id}");

    let response = self
      .client
      .get(&url)
      .header("User-Agent", USER_AGENT)
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("Places details request failed: {}", e))?;

    Ok(parse_place(&response)?)
  }
}

/// Provider for self-hosted endpoints that speak the same payload,
/// with the query substituted into a URL template.
pub struct CustomProvider {
  name: String,
  url_template: String,
  headers: HashMap<String, String>,
  client: surf::Client,
}

impl CustomProvider {
  #[must_use]
  pub fn new(name: String, url_template: String, headers: Option<HashMap<String, String>>) -> Self {
    Self {
      name,
      url_template,
      headers: headers.unwrap_or_default(),
      client: surf::Client::new(),
    }
  }

  async fn get_json(&self, url: &str) -> Result<Value> {
    let mut request = self.client.get(url);

    for (key, value) in &self.headers {
      request = request.header(key.as_str(), value.as_str());
    }

    request
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("Custom places request failed: {}", e))
  }
}

#[async_trait::async_trait]
impl PlacesClient for CustomProvider {
  fn name(&self) -> &str {
    &self.name
  }

  async fn find_predictions(&self, request: &PredictionsRequest) -> Result<Vec<Prediction>> {
    let url = self
      .url_template
      .replace("{query}", &urlencoding::encode(&request.query))
      .replace("{session}", &request.session_token.to_string());

    let response = self.get_json(&url).await?;
    Ok(parse_predictions(&response)?)
  }

  async fn fetch_place(&self, place_id: &str, _fields: &[PlaceField]) -> Result<Place> {
    let url = self
      .url_template
      .replace("{query}", &urlencoding::encode(place_id));

    let response = self.get_json(&url).await?;
    Ok(parse_place(&response)?)
  }
}

fn bias_radius_meters(bias: &super::LocationBias) -> u32 {
  let (lat, _) = bias.center();
  let lat_m = (bias.north - bias.south).abs() * 111_320.0;
  let lon_m = (bias.east - bias.west).abs() * 111_320.0 * lat.to_radians().cos();
  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  let radius = (lat_m.hypot(lon_m) / 2.0).max(1.0) as u32;
  radius
}

fn check_status(response: &Value) -> Result<(), PlacesError> {
  let status = response["status"].as_str().unwrap_or("UNKNOWN");
  if status == "OK" || status == "ZERO_RESULTS" {
    return Ok(());
  }

  Err(PlacesError::Status {
    status: status.to_string(),
    message: response["error_message"]
      .as_str()
      .unwrap_or("no error message")
      .to_string(),
  })
}

fn parse_predictions(response: &Value) -> Result<Vec<Prediction>, PlacesError> {
  check_status(response)?;

  let mut predictions = Vec::new();

  if let Some(items) = response["predictions"].as_array() {
    for item in items {
      let (Some(place_id), Some(description)) =
        (item["place_id"].as_str(), item["description"].as_str())
      else {
        log::warn!("Skipping prediction without place_id/description");
        continue;
      };

      let formatting = &item["structured_formatting"];
      let main_text = formatting["main_text"]
        .as_str()
        .unwrap_or(description)
        .to_string();
      let secondary_text = formatting["secondary_text"]
        .as_str()
        .map(std::string::ToString::to_string);

      predictions.push(Prediction {
        place_id: place_id.to_string(),
        description: description.to_string(),
        main_text,
        secondary_text,
      });
    }
  }

  Ok(predictions)
}

fn parse_place(response: &Value) -> Result<Place, PlacesError> {
  check_status(response)?;

  let result = &response["result"];
  if result.is_null() {
    return Err(PlacesError::Payload("result"));
  }

  let location = result["geometry"]["location"].as_object().and_then(|l| {
    Some((
      l.get("lat")?.as_f64()?,
      l.get("lng")?.as_f64()?,
    ))
  });

  Ok(Place {
    place_id: result["place_id"].as_str().map(ToString::to_string),
    name: result["name"].as_str().map(ToString::to_string),
    address: result["formatted_address"].as_str().map(ToString::to_string),
    location,
    types: result["types"]
      .as_array()
      .map(|t| {
        t.iter()
          .filter_map(Value::as_str)
          .map(ToString::to_string)
          .collect()
      })
      .unwrap_or_default(),
  })
}
