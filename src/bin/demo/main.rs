use std::sync::{Arc, Mutex};

use clap::Parser;
use placefield::config::Config;
use placefield::places::google::{CustomProvider, GooglePlacesProvider};
use placefield::places::{Place, PlacesClient, PlacesClientConfig};
use placefield::widget::PlaceLoadListener;
use placefield::{AutocompleteLocation, StyleAttrs};

#[derive(Parser)]
#[command(name = "placefield-demo", about = "Place-autocomplete field demo")]
struct Args {
  /// Google Places API key (falls back to config/env).
  #[arg(long)]
  api_key: Option<String>,
  /// Two-letter country code to restrict suggestions to.
  #[arg(long)]
  country: Option<String>,
}

type EventLog = Arc<Mutex<Vec<String>>>;

struct LoggingPlaceListener {
  events: EventLog,
}

impl PlaceLoadListener for LoggingPlaceListener {
  fn on_place_loaded(&mut self, place: Place) {
    self.events.lock().unwrap().push(format!(
      "place loaded: {} @ {:?}",
      place.name.as_deref().unwrap_or("<unnamed>"),
      place.location
    ));
  }

  fn on_place_failed(&mut self, message: &str) {
    self
      .events
      .lock()
      .unwrap()
      .push(format!("place fetch failed: {message}"));
  }
}

struct DemoApp {
  field: AutocompleteLocation,
  events: EventLog,
}

impl DemoApp {
  fn new(client: Arc<dyn PlacesClient>, country: Option<String>, min_chars: Option<usize>) -> Self {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let attrs = StyleAttrs {
      hint_text: Some("Search for a city...".to_string()),
      country_code: country,
      min_chars,
      ..Default::default()
    };
    let mut field = AutocompleteLocation::new(client, &attrs);

    let log = events.clone();
    field.on_item_selected(move |prediction| {
      log.lock().unwrap().push(format!(
        "selected: {} ({})",
        prediction.full_text(),
        prediction.place_id
      ));
    });

    let log = events.clone();
    field.on_text_clear(move || {
      log.lock().unwrap().push("text cleared".to_string());
    });

    let log = events.clone();
    field.on_search(move |text, predictions| {
      log
        .lock()
        .unwrap()
        .push(format!("search: '{text}' with {} predictions", predictions.len()));
    });

    field.set_place_listener(LoggingPlaceListener {
      events: events.clone(),
    });

    Self { field, events }
  }
}

impl eframe::App for DemoApp {
  fn ui(&mut self, ui: &mut egui::Ui, frame: &mut eframe::Frame) {
    let ctx = ui.ctx().clone();
    #[allow(deprecated)]
    self.update(&ctx, frame);
  }

  #[allow(deprecated)]
  fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
    egui::CentralPanel::default().show(ctx, |ui| {
      ui.heading("placefield");
      ui.add_space(8.0);
      self.field.ui(ui);

      ui.add_space(12.0);
      ui.separator();
      ui.strong("Events");
      egui::ScrollArea::vertical().show(ui, |ui| {
        for event in self.events.lock().unwrap().iter().rev() {
          ui.small(event);
        }
      });
    });
  }
}

fn build_client(config: &Config, args: &Args) -> Arc<dyn PlacesClient> {
  if let Some(api_key) = &args.api_key {
    return Arc::new(GooglePlacesProvider::new(api_key.clone(), None));
  }

  match &config.places_provider {
    Some(PlacesClientConfig::Google { api_key, base_url }) => Arc::new(GooglePlacesProvider::new(
      api_key.clone(),
      base_url.clone(),
    )),
    Some(PlacesClientConfig::Custom {
      name,
      url_template,
      headers,
    }) => Arc::new(CustomProvider::new(
      name.clone(),
      url_template.clone(),
      headers.clone(),
    )),
    None => {
      log::warn!("No API key configured, queries will be rejected by the service");
      Arc::new(GooglePlacesProvider::new(String::new(), None))
    }
  }
}

fn main() -> eframe::Result {
  // init logger.
  env_logger::init();

  // Tokio runtime for the widget's query tasks.
  let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
  let _enter = rt.enter();

  let args = Args::parse();
  let config = Config::new();
  let client = build_client(&config, &args);
  let country = args.country.clone().or_else(|| config.country.clone());

  let options = eframe::NativeOptions {
    viewport: egui::ViewportBuilder {
      inner_size: Some(egui::vec2(480.0, 640.0)),
      ..Default::default()
    },
    ..Default::default()
  };

  eframe::run_native(
    "placefield",
    options,
    Box::new(move |_cc| Ok(Box::new(DemoApp::new(client, country, config.min_chars)))),
  )
}
