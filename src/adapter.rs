use crate::places::Prediction;

/// Backing list for the suggestion drop-down. Replaced wholesale on
/// each successful query, never merged incrementally.
#[derive(Debug, Default)]
pub struct PredictionAdapter {
  results: Vec<Prediction>,
}

impl PredictionAdapter {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the backing list with a fresh set of predictions.
  pub fn set_results(&mut self, predictions: Vec<Prediction>) {
    self.results = predictions;
  }

  /// Discard all rows, used after a clear, a search submission or a
  /// failed query.
  pub fn invalidate(&mut self) {
    self.results.clear();
  }

  #[must_use]
  pub fn get(&self, index: usize) -> Option<&Prediction> {
    self.results.get(index)
  }

  #[must_use]
  pub fn results(&self) -> &[Prediction] {
    &self.results
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.results.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.results.is_empty()
  }

  /// Row label shown in the drop-down. Long main texts are truncated
  /// by character count, not bytes.
  #[must_use]
  pub fn row_text(prediction: &Prediction) -> String {
    let main = if prediction.main_text.chars().count() > 40 {
      let truncated: String = prediction.main_text.chars().take(37).collect();
      format!("{truncated}...")
    } else {
      prediction.main_text.clone()
    };

    match &prediction.secondary_text {
      Some(secondary) => format!("{main} - {secondary}"),
      None => main,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn prediction(id: &str, description: &str) -> Prediction {
    Prediction {
      place_id: id.to_string(),
      description: description.to_string(),
      main_text: description.to_string(),
      secondary_text: None,
    }
  }

  #[test]
  fn set_results_replaces_wholesale() {
    let mut adapter = PredictionAdapter::new();
    adapter.set_results(vec![prediction("a", "Aachen"), prediction("b", "Berlin")]);
    assert_eq!(adapter.len(), 2);
    assert_eq!(adapter.get(1).unwrap().place_id, "b");

    adapter.set_results(vec![prediction("c", "Cottbus")]);
    assert_eq!(adapter.len(), 1);
    assert_eq!(adapter.get(0).unwrap().place_id, "c");
    assert!(adapter.get(1).is_none());
  }

  #[test]
  fn invalidate_empties_the_list() {
    let mut adapter = PredictionAdapter::new();
    adapter.set_results(vec![prediction("a", "Aachen")]);
    adapter.invalidate();
    assert!(adapter.is_empty());
    assert!(adapter.get(0).is_none());
  }

  #[test]
  fn row_text_truncates_by_characters() {
    let mut long = prediction("a", "x");
    long.main_text = "ü".repeat(60);
    let text = PredictionAdapter::row_text(&long);
    assert!(text.ends_with("..."));
    assert_eq!(text.chars().count(), 40);
  }

  #[test]
  fn row_text_appends_secondary() {
    let mut p = prediction("a", "Berlin, Germany");
    p.main_text = "Berlin".to_string();
    p.secondary_text = Some("Germany".to_string());
    assert_eq!(PredictionAdapter::row_text(&p), "Berlin - Germany");
  }
}
