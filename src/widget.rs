use crate::adapter::PredictionAdapter;
use crate::places::{
  LocationBias, Place, PlaceField, PlacesClient, Prediction, PredictionsRequest, SessionToken,
};
use crate::style::{FieldStyle, StyleAttrs};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::{Duration, Instant};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_DISPLAY: Duration = Duration::from_secs(4);
const CLOSE_ICON_WIDTH: f32 = 16.0;
const POPUP_MAX_HEIGHT: f32 = 200.0;

pub type SelectionListener = Box<dyn FnMut(&Prediction) + Send>;
pub type ClearListener = Box<dyn FnMut() + Send>;
pub type SearchListener = Box<dyn FnMut(&str, &[Prediction]) + Send>;

/// Receiver for the optional detail fetch issued after a selection.
pub trait PlaceLoadListener: Send {
  fn on_place_loaded(&mut self, place: Place);
  fn on_place_failed(&mut self, message: &str);
}

struct QueryOutcome {
  seq: u64,
  result: Result<Vec<Prediction>, String>,
}

struct ErrorFlash {
  message: String,
  shown_at: Instant,
}

/// A text field with place-autocomplete suggestions.
///
/// Keystrokes at or above the minimum filter length are forwarded to
/// the [`PlacesClient`] on a tokio task; outcomes come back over an
/// mpsc channel drained once per frame, so all state mutation stays on
/// the UI thread. Every query carries a sequence number and responses
/// that are not the latest issued are dropped.
pub struct AutocompleteLocation {
  client: Arc<dyn PlacesClient>,
  style: FieldStyle,
  adapter: PredictionAdapter,
  token: SessionToken,
  query: String,

  country: Option<String>,
  location_bias: Option<LocationBias>,
  place_fields: Vec<PlaceField>,

  enabled: bool,
  was_empty: bool,
  popup_open: bool,
  selected_index: Option<usize>,
  issued_seq: u64,
  handled_seq: u64,
  last_queried: String,
  error: Option<ErrorFlash>,

  prediction_tx: Sender<QueryOutcome>,
  prediction_rx: Receiver<QueryOutcome>,
  place_tx: Sender<Result<Place, String>>,
  place_rx: Receiver<Result<Place, String>>,

  on_item_selected: Option<SelectionListener>,
  on_text_clear: Option<ClearListener>,
  on_search: Option<SearchListener>,
  place_listener: Option<Box<dyn PlaceLoadListener>>,
}

impl AutocompleteLocation {
  /// Build the widget. The attribute bag is resolved once here; later
  /// changes to it are not observed. The session token is created here
  /// and reused for every query of this instance.
  #[must_use]
  pub fn new(client: Arc<dyn PlacesClient>, attrs: &StyleAttrs) -> Self {
    let style = attrs.resolve();
    let country = style.country_code.clone();
    let (prediction_tx, prediction_rx) = channel();
    let (place_tx, place_rx) = channel();

    Self {
      client,
      style,
      adapter: PredictionAdapter::new(),
      token: SessionToken::new(),
      query: String::new(),
      country,
      location_bias: None,
      place_fields: PlaceField::defaults(),
      enabled: true,
      was_empty: true,
      popup_open: false,
      selected_index: None,
      issued_seq: 0,
      handled_seq: 0,
      last_queried: String::new(),
      error: None,
      prediction_tx,
      prediction_rx,
      place_tx,
      place_rx,
      on_item_selected: None,
      on_text_clear: None,
      on_search: None,
      place_listener: None,
    }
  }

  // --- host-facing configuration, consulted fresh on every query ---

  pub fn set_country(&mut self, country: Option<String>) {
    self.country = country;
  }

  pub fn set_location_bias(&mut self, bias: Option<LocationBias>) {
    self.location_bias = bias;
  }

  pub fn set_place_fields(&mut self, fields: Vec<PlaceField>) {
    self.place_fields = fields;
  }

  /// Register the item-selected listener. Last registration wins.
  pub fn on_item_selected(&mut self, listener: impl FnMut(&Prediction) + Send + 'static) {
    self.on_item_selected = Some(Box::new(listener));
  }

  /// Register the text-cleared listener, fired once per transition of
  /// the field into empty.
  pub fn on_text_clear(&mut self, listener: impl FnMut() + Send + 'static) {
    self.on_text_clear = Some(Box::new(listener));
  }

  /// Register the search listener, fired on the Enter/search action
  /// with the raw typed text and the current prediction list.
  pub fn on_search(&mut self, listener: impl FnMut(&str, &[Prediction]) + Send + 'static) {
    self.on_search = Some(Box::new(listener));
  }

  /// Register the place-detail listener. Its presence is what enables
  /// the detail fetch after a selection.
  pub fn set_place_listener(&mut self, listener: impl PlaceLoadListener + 'static) {
    self.place_listener = Some(Box::new(listener));
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
    if !enabled {
      self.popup_open = false;
      self.selected_index = None;
    }
  }

  // --- accessors ---

  #[must_use]
  pub fn text(&self) -> &str {
    &self.query
  }

  #[must_use]
  pub fn token(&self) -> SessionToken {
    self.token
  }

  #[must_use]
  pub fn adapter(&self) -> &PredictionAdapter {
    &self.adapter
  }

  #[must_use]
  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  #[must_use]
  pub fn popup_open(&self) -> bool {
    self.popup_open
  }

  /// The row currently highlighted by keyboard navigation or hover.
  #[must_use]
  pub fn highlighted(&self) -> Option<usize> {
    self.selected_index
  }

  #[must_use]
  pub fn clear_icon_visible(&self) -> bool {
    self.enabled && !self.query.is_empty()
  }

  #[must_use]
  pub fn error_message(&self) -> Option<&str> {
    self.error.as_ref().map(|e| e.message.as_str())
  }

  /// Whether a query has been submitted whose outcome has not been
  /// delivered yet.
  #[must_use]
  pub fn query_in_flight(&self) -> bool {
    self.issued_seq > self.handled_seq
  }

  /// Whether a primary click at `pointer` lands on the clear icon, a
  /// region measured from the field's right edge minus end padding.
  #[must_use]
  pub fn clear_icon_hit(field_rect: egui::Rect, pointer: egui::Pos2, end_padding: f32) -> bool {
    field_rect.contains(pointer) && pointer.x > field_rect.right() - end_padding - CLOSE_ICON_WIDTH
  }

  // --- state transitions ---

  /// Programmatic text change, equivalent to the user editing the
  /// field to `text`.
  pub fn set_text(&mut self, text: impl Into<String>) {
    self.query = text.into();
    self.text_changed();
  }

  /// Clear the field, as the clear-icon tap does.
  pub fn clear(&mut self) {
    self.query.clear();
    self.text_changed();
  }

  fn text_changed(&mut self) {
    let is_empty = self.query.is_empty();

    if is_empty && !self.was_empty {
      if let Some(listener) = &mut self.on_text_clear {
        listener();
      }
    }
    self.was_empty = is_empty;

    if !self.enabled {
      return;
    }

    if self.query.chars().count() >= self.style.min_chars {
      self.request_predictions();
    } else {
      self.popup_open = false;
      self.selected_index = None;
      // Allow re-querying the same text after a clear.
      self.last_queried.clear();
    }
  }

  fn request_predictions(&mut self) {
    if self.query == self.last_queried {
      return;
    }
    self.last_queried.clone_from(&self.query);

    self.issued_seq += 1;
    let seq = self.issued_seq;
    let request = PredictionsRequest::new(self.query.clone(), self.token)
      .with_country(self.country.clone())
      .with_location_bias(self.location_bias);
    let client = Arc::clone(&self.client);
    let tx = self.prediction_tx.clone();

    debug!("Submitting query #{seq} for '{}'", request.query);
    tokio::spawn(async move {
      let result = match tokio::time::timeout(QUERY_TIMEOUT, client.find_predictions(&request)).await
      {
        Ok(Ok(predictions)) => Ok(predictions),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("Autocomplete query timed out".to_string()),
      };
      let _ = tx.send(QueryOutcome { seq, result });
    });
  }

  /// Drain async outcomes back onto the UI thread. Called once per
  /// frame from [`Self::ui`]; tests call it directly.
  pub fn poll(&mut self) {
    while let Ok(outcome) = self.prediction_rx.try_recv() {
      self.handled_seq = self.handled_seq.max(outcome.seq);

      if outcome.seq != self.issued_seq {
        debug!(
          "Discarding stale response #{} (latest is #{})",
          outcome.seq, self.issued_seq
        );
        continue;
      }

      match outcome.result {
        Ok(predictions) => {
          debug!("Query #{} returned {} predictions", outcome.seq, predictions.len());
          self.adapter.set_results(predictions);
          self.popup_open = !self.adapter.is_empty();
          self.selected_index = None;
        }
        Err(message) => {
          warn!("Autocomplete query failed: {message}");
          self.adapter.invalidate();
          self.popup_open = false;
          self.selected_index = None;
          self.error = Some(ErrorFlash {
            message,
            shown_at: Instant::now(),
          });
        }
      }
    }

    while let Ok(result) = self.place_rx.try_recv() {
      if let Some(listener) = &mut self.place_listener {
        match result {
          Ok(place) => listener.on_place_loaded(place),
          Err(message) => {
            warn!("Place details fetch failed: {message}");
            listener.on_place_failed(&message);
          }
        }
      }
    }
  }

  /// Commit row `index`: close the popup, put the row's full text into
  /// the field, fire the selection listener and, only when a place
  /// listener is registered, start the detail fetch.
  pub fn select(&mut self, index: usize) {
    let Some(prediction) = self.adapter.get(index).cloned() else {
      warn!(
        "Selection index {index} out of bounds ({} rows)",
        self.adapter.len()
      );
      return;
    };

    self.query = prediction.full_text().to_string();
    // Committing a row must not immediately re-query with its text.
    self.last_queried.clone_from(&self.query);
    self.was_empty = false;
    self.popup_open = false;
    self.selected_index = None;

    if let Some(listener) = &mut self.on_item_selected {
      listener(&prediction);
    }

    if self.place_listener.is_some() {
      self.fetch_place(prediction.place_id.clone());
    }
  }

  fn fetch_place(&mut self, place_id: String) {
    let client = Arc::clone(&self.client);
    let tx = self.place_tx.clone();
    let fields = self.place_fields.clone();

    debug!("Fetching details for place {place_id}");
    tokio::spawn(async move {
      let result = match tokio::time::timeout(QUERY_TIMEOUT, client.fetch_place(&place_id, &fields))
        .await
      {
        Ok(Ok(place)) => Ok(place),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("Place details fetch timed out".to_string()),
      };
      let _ = tx.send(result);
    });
  }

  /// The Enter/search action: deliver the raw text and the current
  /// prediction list, then invalidate the adapter.
  pub fn submit_search(&mut self) {
    if let Some(listener) = &mut self.on_search {
      listener(&self.query, self.adapter.results());
    }
    self.adapter.invalidate();
    self.popup_open = false;
    self.selected_index = None;
  }

  /// Move the highlight one row down, clamped to the last row.
  pub fn highlight_next(&mut self) {
    if self.adapter.is_empty() {
      return;
    }
    self.selected_index = Some(
      self
        .selected_index
        .map_or(0, |i| (i + 1).min(self.adapter.len() - 1)),
    );
  }

  /// Move the highlight one row up, wrapping in from the bottom when
  /// nothing is highlighted yet.
  pub fn highlight_prev(&mut self) {
    if self.adapter.is_empty() {
      return;
    }
    self.selected_index = Some(
      self
        .selected_index
        .map_or(self.adapter.len() - 1, |i| i.saturating_sub(1)),
    );
  }

  /// Consume Escape while the popup is open: close it and drop focus.
  pub fn dismiss_popup(&mut self) {
    self.popup_open = false;
    self.selected_index = None;
  }

  // --- rendering ---

  pub fn ui(&mut self, ui: &mut egui::Ui) -> egui::Response {
    self.poll();

    let frame = egui::Frame::new()
      .fill(self.style.background)
      .corner_radius(self.style.corner_radius)
      .inner_margin(self.style.padding);

    let inner = frame.show(ui, |ui| {
      let hint = egui::RichText::new(&self.style.hint_text).color(self.style.hint_color);
      let text_edit = if self.style.max_lines > 1 {
        egui::TextEdit::multiline(&mut self.query).desired_rows(self.style.max_lines)
      } else {
        egui::TextEdit::singleline(&mut self.query)
      }
      .hint_text(hint)
      .text_color(self.style.text_color)
      .interactive(self.enabled);

      let response = ui.add_sized([ui.available_width(), 0.0], text_edit);

      if response.changed() {
        self.text_changed();
      }

      if self.clear_icon_visible() {
        self.draw_clear_icon(ui, &response);
        if response.clicked()
          && let Some(pointer) = ui.input(|i| i.pointer.interact_pos())
          && Self::clear_icon_hit(response.rect, pointer, f32::from(self.style.padding.right))
        {
          self.clear();
          response.surrender_focus();
        }
      }

      let enter_pressed = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
      if enter_pressed {
        if let Some(index) = self.selected_index {
          self.select(index);
        } else {
          self.submit_search();
        }
        response.surrender_focus();
      }

      if self.popup_open {
        self.handle_popup_keys(ui, &response);
      }

      if self.popup_open && !self.adapter.is_empty() {
        self.show_popup(ui, response.rect, response.id.with("placefield_popup"));
      }

      if self.query_in_flight() {
        ui.horizontal(|ui| {
          ui.spinner();
          ui.small("Searching...");
        });
        ui.ctx().request_repaint_after(Duration::from_millis(100));
      }

      self.show_error_flash(ui);

      response
    });

    inner.inner
  }

  fn draw_clear_icon(&self, ui: &egui::Ui, response: &egui::Response) {
    let rect = response.rect;
    let pos = egui::pos2(
      rect.right() - f32::from(self.style.padding.right).max(2.0),
      rect.center().y,
    );
    ui.painter().text(
      pos,
      egui::Align2::RIGHT_CENTER,
      &self.style.close_icon,
      egui::FontId::proportional(14.0),
      self.style.hint_color,
    );
  }

  fn handle_popup_keys(&mut self, ui: &egui::Ui, response: &egui::Response) {
    let (down, up) = ui.input(|i| {
      (
        i.key_pressed(egui::Key::ArrowDown),
        i.key_pressed(egui::Key::ArrowUp),
      )
    });
    let escape =
      ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Escape));

    if down {
      self.highlight_next();
    } else if up {
      self.highlight_prev();
    }

    if escape {
      self.dismiss_popup();
      response.surrender_focus();
    }
  }

  fn show_popup(&mut self, ui: &egui::Ui, field_rect: egui::Rect, popup_id: egui::Id) {
    egui::Area::new(popup_id)
      .order(egui::Order::Foreground)
      .fixed_pos(field_rect.left_bottom() + egui::vec2(0.0, 4.0))
      .show(ui.ctx(), |ui| {
        egui::Frame::popup(ui.style()).show(ui, |ui| {
          ui.set_min_width(field_rect.width());

          egui::ScrollArea::vertical()
            .max_height(POPUP_MAX_HEIGHT)
            .show(ui, |ui| {
              let mut clicked_index = None;
              // Cloned so hover can move the highlight mid-iteration.
              let rows = self.adapter.results().to_vec();

              for (index, prediction) in rows.iter().enumerate() {
                let is_selected = self.selected_index == Some(index);
                let row = ui.add_sized(
                  [ui.available_width(), 0.0],
                  egui::Button::new(PredictionAdapter::row_text(prediction))
                    .fill(if is_selected {
                      ui.style().visuals.selection.bg_fill
                    } else {
                      egui::Color32::TRANSPARENT
                    })
                    .stroke(egui::Stroke::NONE),
                );

                if row.clicked() {
                  clicked_index = Some(index);
                }

                if row.hovered() {
                  self.selected_index = Some(index);
                  ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                }
              }

              if let Some(index) = clicked_index {
                self.select(index);
              }
            });
        });
      });
  }

  fn show_error_flash(&mut self, ui: &mut egui::Ui) {
    if self
      .error
      .as_ref()
      .is_some_and(|e| e.shown_at.elapsed() >= ERROR_DISPLAY)
    {
      self.error = None;
    }

    if let Some(error) = &self.error {
      ui.colored_label(
        ui.style().visuals.error_fg_color,
        egui::RichText::new(&error.message).small(),
      );
      ui.ctx().request_repaint_after(Duration::from_millis(250));
    }
  }
}
