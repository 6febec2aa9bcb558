use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use placefield::places::{
  Place, PlaceField, PlacesClient, Prediction, PredictionsRequest, SessionToken,
};
use placefield::widget::PlaceLoadListener;
use placefield::{AutocompleteLocation, StyleAttrs};

/// Mock provider returning one prediction per query whose description
/// echoes the query text, so tests can tell responses apart.
#[derive(Default)]
struct MockPlaces {
  fail_with: Mutex<Option<String>>,
  extra_rows: Mutex<Vec<Prediction>>,
  delay_ms_by_query: Mutex<HashMap<String, u64>>,
  prediction_requests: Mutex<Vec<PredictionsRequest>>,
  place_requests: Mutex<Vec<String>>,
}

impl MockPlaces {
  fn tokens_seen(&self) -> Vec<SessionToken> {
    self
      .prediction_requests
      .lock()
      .unwrap()
      .iter()
      .map(|r| r.session_token)
      .collect()
  }

  fn prediction_call_count(&self) -> usize {
    self.prediction_requests.lock().unwrap().len()
  }
}

fn prediction(id: &str, text: &str) -> Prediction {
  Prediction {
    place_id: id.to_string(),
    description: text.to_string(),
    main_text: text.to_string(),
    secondary_text: None,
  }
}

#[async_trait::async_trait]
impl PlacesClient for MockPlaces {
  fn name(&self) -> &'static str {
    "mock"
  }

  async fn find_predictions(&self, request: &PredictionsRequest) -> Result<Vec<Prediction>> {
    self
      .prediction_requests
      .lock()
      .unwrap()
      .push(request.clone());

    let delay = self
      .delay_ms_by_query
      .lock()
      .unwrap()
      .get(&request.query)
      .copied()
      .unwrap_or(0);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let failure = self.fail_with.lock().unwrap().clone();
    if let Some(message) = failure {
      anyhow::bail!(message);
    }

    let mut rows = vec![prediction(&format!("id-{}", request.query), &request.query)];
    rows.extend(self.extra_rows.lock().unwrap().iter().cloned());
    Ok(rows)
  }

  async fn fetch_place(&self, place_id: &str, fields: &[PlaceField]) -> Result<Place> {
    self.place_requests.lock().unwrap().push(place_id.to_string());

    Ok(Place {
      place_id: fields
        .contains(&PlaceField::Id)
        .then(|| place_id.to_string()),
      name: fields.contains(&PlaceField::Name).then(|| "Mockton".to_string()),
      address: None,
      location: fields
        .contains(&PlaceField::Location)
        .then_some((52.52, 13.405)),
      types: Vec::new(),
    })
  }
}

fn widget_with(client: &Arc<MockPlaces>) -> AutocompleteLocation {
  AutocompleteLocation::new(client.clone(), &StyleAttrs::default())
}

/// Let spawned query tasks finish and drain their outcomes.
async fn settle(field: &mut AutocompleteLocation) {
  tokio::time::sleep(Duration::from_millis(50)).await;
  field.poll();
}

#[tokio::test]
async fn successful_query_refills_the_adapter() {
  let client = Arc::new(MockPlaces::default());
  client
    .extra_rows
    .lock()
    .unwrap()
    .push(prediction("id-extra", "Bergen, Norway"));
  let mut field = widget_with(&client);

  field.set_text("ber");
  settle(&mut field).await;

  assert_eq!(field.adapter().len(), 2);
  assert_eq!(field.adapter().get(0).unwrap().description, "ber");
  assert_eq!(field.adapter().get(1).unwrap().place_id, "id-extra");
  assert!(field.popup_open());
}

#[tokio::test]
async fn failed_query_invalidates_the_adapter() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  field.set_text("ber");
  settle(&mut field).await;
  assert_eq!(field.adapter().len(), 1);

  *client.fail_with.lock().unwrap() = Some("quota exceeded".to_string());
  field.set_text("berl");
  settle(&mut field).await;

  assert_eq!(field.adapter().len(), 0);
  assert!(!field.popup_open());
  assert!(field.error_message().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn stale_response_is_discarded() {
  let client = Arc::new(MockPlaces::default());
  client
    .delay_ms_by_query
    .lock()
    .unwrap()
    .insert("be".to_string(), 100);
  let mut field = widget_with(&client);

  field.set_text("be");
  field.set_text("ber");

  // Wait until both responses, including the slow stale one, are in.
  tokio::time::sleep(Duration::from_millis(250)).await;
  field.poll();

  assert_eq!(field.adapter().len(), 1);
  assert_eq!(field.adapter().get(0).unwrap().description, "ber");
}

#[tokio::test]
async fn text_clear_fires_once_per_transition_into_empty() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  let clears = Arc::new(AtomicUsize::new(0));
  let counter = clears.clone();
  field.on_text_clear(move || {
    counter.fetch_add(1, Ordering::SeqCst);
  });

  assert!(!field.clear_icon_visible());
  field.set_text("b");
  assert!(field.clear_icon_visible());
  assert_eq!(clears.load(Ordering::SeqCst), 0);

  field.set_text("");
  assert!(!field.clear_icon_visible());
  assert_eq!(clears.load(Ordering::SeqCst), 1);

  // Already empty, no further transition.
  field.set_text("");
  assert_eq!(clears.load(Ordering::SeqCst), 1);

  field.set_text("a");
  field.clear();
  assert_eq!(clears.load(Ordering::SeqCst), 2);
  assert!(field.text().is_empty());
}

#[test]
fn clear_icon_hit_region_is_measured_from_the_right_edge() {
  let rect = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(200.0, 24.0));

  assert!(AutocompleteLocation::clear_icon_hit(
    rect,
    egui::pos2(190.0, 12.0),
    8.0
  ));
  assert!(!AutocompleteLocation::clear_icon_hit(
    rect,
    egui::pos2(100.0, 12.0),
    8.0
  ));
  // Inside the x band but outside the field itself.
  assert!(!AutocompleteLocation::clear_icon_hit(
    rect,
    egui::pos2(190.0, 40.0),
    8.0
  ));
}

#[tokio::test]
async fn dismissing_the_popup_clears_state_and_highlight() {
  let client = Arc::new(MockPlaces::default());
  client
    .extra_rows
    .lock()
    .unwrap()
    .push(prediction("id-extra", "Bergen, Norway"));
  let mut field = widget_with(&client);

  field.set_text("ber");
  settle(&mut field).await;
  assert!(field.popup_open());
  assert_eq!(field.highlighted(), None);

  field.highlight_next();
  assert_eq!(field.highlighted(), Some(0));
  field.highlight_next();
  assert_eq!(field.highlighted(), Some(1));
  // Clamped at the last row.
  field.highlight_next();
  assert_eq!(field.highlighted(), Some(1));
  field.highlight_prev();
  assert_eq!(field.highlighted(), Some(0));

  field.dismiss_popup();
  assert!(!field.popup_open());
  assert_eq!(field.highlighted(), None);

  // The adapter keeps its rows, only the popup state is reset.
  assert_eq!(field.adapter().len(), 2);
}

struct CapturingPlaceListener {
  places: Arc<Mutex<Vec<Place>>>,
  failures: Arc<Mutex<Vec<String>>>,
}

impl PlaceLoadListener for CapturingPlaceListener {
  fn on_place_loaded(&mut self, place: Place) {
    self.places.lock().unwrap().push(place);
  }

  fn on_place_failed(&mut self, message: &str) {
    self.failures.lock().unwrap().push(message.to_string());
  }
}

#[tokio::test]
async fn selection_fires_listener_and_one_detail_fetch() {
  let client = Arc::new(MockPlaces::default());
  client
    .extra_rows
    .lock()
    .unwrap()
    .push(prediction("id-extra", "Bergen, Norway"));
  let mut field = widget_with(&client);

  let selected = Arc::new(Mutex::new(Vec::<Prediction>::new()));
  let sink = selected.clone();
  field.on_item_selected(move |p| sink.lock().unwrap().push(p.clone()));

  let places = Arc::new(Mutex::new(Vec::new()));
  let failures = Arc::new(Mutex::new(Vec::new()));
  field.set_place_listener(CapturingPlaceListener {
    places: places.clone(),
    failures: failures.clone(),
  });

  field.set_text("ber");
  settle(&mut field).await;

  field.select(1);
  assert_eq!(field.text(), "Bergen, Norway");
  assert!(!field.popup_open());

  settle(&mut field).await;
  assert_eq!(selected.lock().unwrap().len(), 1);
  assert_eq!(selected.lock().unwrap()[0].place_id, "id-extra");
  assert_eq!(*client.place_requests.lock().unwrap(), vec!["id-extra"]);
  assert_eq!(places.lock().unwrap().len(), 1);
  assert!(failures.lock().unwrap().is_empty());
}

#[tokio::test]
async fn selection_without_place_listener_skips_the_detail_fetch() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  field.set_text("ber");
  settle(&mut field).await;
  field.select(0);
  settle(&mut field).await;

  assert!(client.place_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn detail_fetch_respects_the_configured_field_set() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  let places = Arc::new(Mutex::new(Vec::new()));
  field.set_place_listener(CapturingPlaceListener {
    places: places.clone(),
    failures: Arc::new(Mutex::new(Vec::new())),
  });
  field.set_place_fields(vec![PlaceField::Name]);

  field.set_text("ber");
  settle(&mut field).await;
  field.select(0);
  settle(&mut field).await;

  let places = places.lock().unwrap();
  assert_eq!(places.len(), 1);
  assert_eq!(places[0].name.as_deref(), Some("Mockton"));
  assert!(places[0].place_id.is_none());
  assert!(places[0].location.is_none());
}

#[tokio::test]
async fn search_submission_delivers_text_and_list_then_invalidates() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  let searches = Arc::new(Mutex::new(Vec::<(String, usize)>::new()));
  let sink = searches.clone();
  field.on_search(move |text, predictions| {
    sink
      .lock()
      .unwrap()
      .push((text.to_string(), predictions.len()));
  });

  field.set_text("ber");
  settle(&mut field).await;
  assert_eq!(field.adapter().len(), 1);

  field.submit_search();
  assert_eq!(*searches.lock().unwrap(), vec![("ber".to_string(), 1)]);
  assert!(field.adapter().is_empty());
  assert!(!field.popup_open());
}

#[tokio::test]
async fn disabling_hides_the_icon_and_suppresses_queries() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  field.set_text("berlin");
  settle(&mut field).await;
  assert!(field.clear_icon_visible());
  let calls_before = client.prediction_call_count();

  field.set_enabled(false);
  assert!(!field.clear_icon_visible());
  assert!(!field.popup_open());

  field.set_text("hamburg");
  settle(&mut field).await;
  assert_eq!(client.prediction_call_count(), calls_before);

  field.set_enabled(true);
  assert!(field.clear_icon_visible());
}

#[tokio::test]
async fn session_token_never_changes_across_queries() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  field.set_text("be");
  settle(&mut field).await;
  field.set_text("ber");
  settle(&mut field).await;
  field.set_text("berl");
  settle(&mut field).await;

  let tokens = client.tokens_seen();
  assert_eq!(tokens.len(), 3);
  assert!(tokens.iter().all(|t| *t == field.token()));
}

#[tokio::test]
async fn input_below_the_filter_threshold_is_not_queried() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  field.set_text("b");
  settle(&mut field).await;
  assert_eq!(client.prediction_call_count(), 0);

  field.set_text("be");
  settle(&mut field).await;
  assert_eq!(client.prediction_call_count(), 1);
}

#[tokio::test]
async fn country_and_bias_flow_into_every_request() {
  let client = Arc::new(MockPlaces::default());
  let mut field = widget_with(&client);

  field.set_country(Some("no".to_string()));
  field.set_location_bias(Some(placefield::LocationBias::new(59.0, 9.0, 61.0, 12.0)));

  field.set_text("ber");
  settle(&mut field).await;

  let requests = client.prediction_requests.lock().unwrap();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].country.as_deref(), Some("no"));
  assert!(requests[0].location_bias.is_some());
}
