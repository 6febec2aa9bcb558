pub mod adapter;
pub mod config;
pub mod places;
pub mod style;
pub mod widget;

pub use adapter::PredictionAdapter;
pub use places::{
  LocationBias, Place, PlaceField, PlacesClient, Prediction, PredictionsRequest, SessionToken,
};
pub use style::{FieldStyle, StyleAttrs};
pub use widget::{AutocompleteLocation, PlaceLoadListener};
