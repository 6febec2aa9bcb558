use egui::{Color32, CornerRadius, Margin};

/// Crate defaults used when an attribute is absent from the bag.
pub mod defaults {
  use egui::Color32;

  pub const BACKGROUND: Color32 = Color32::WHITE;
  pub const CORNER_RADIUS: u8 = 6;
  pub const HINT_TEXT: &str = "Search for a place";
  pub const HINT_COLOR: Color32 = Color32::from_gray(130);
  pub const TEXT_COLOR: Color32 = Color32::from_gray(25);
  pub const MAX_LINES: usize = 1;
  pub const PADDING: i8 = 8;
  pub const CLOSE_ICON: &str = "✕";
  pub const MIN_CHARS: usize = 2;
}

/// Attribute bag handed to the widget constructor. Every field is
/// optional; missing values silently fall back to the crate defaults.
/// Resolution happens exactly once, later changes to a bag are not
/// observed by an already constructed widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleAttrs {
  pub background: Option<Color32>,
  pub corner_radius: Option<u8>,
  pub hint_text: Option<String>,
  pub hint_color: Option<Color32>,
  pub text_color: Option<Color32>,
  pub max_lines: Option<usize>,
  /// Base padding applied to all four sides.
  pub padding: Option<i8>,
  pub padding_left: Option<i8>,
  pub padding_top: Option<i8>,
  pub padding_right: Option<i8>,
  pub padding_bottom: Option<i8>,
  pub close_icon: Option<String>,
  pub country_code: Option<String>,
  pub min_chars: Option<usize>,
}

impl StyleAttrs {
  /// Resolve the bag into concrete values.
  #[must_use]
  pub fn resolve(&self) -> FieldStyle {
    let base_padding = self.padding.unwrap_or(defaults::PADDING);

    FieldStyle {
      background: self.background.unwrap_or(defaults::BACKGROUND),
      corner_radius: CornerRadius::same(self.corner_radius.unwrap_or(defaults::CORNER_RADIUS)),
      hint_text: self
        .hint_text
        .clone()
        .unwrap_or_else(|| defaults::HINT_TEXT.to_string()),
      hint_color: self.hint_color.unwrap_or(defaults::HINT_COLOR),
      text_color: self.text_color.unwrap_or(defaults::TEXT_COLOR),
      max_lines: self.max_lines.unwrap_or(defaults::MAX_LINES).max(1),
      padding: Margin {
        left: self.padding_left.unwrap_or(base_padding),
        top: self.padding_top.unwrap_or(base_padding),
        right: self.padding_right.unwrap_or(base_padding),
        bottom: self.padding_bottom.unwrap_or(base_padding),
      },
      close_icon: self
        .close_icon
        .clone()
        .unwrap_or_else(|| defaults::CLOSE_ICON.to_string()),
      country_code: self.country_code.clone(),
      min_chars: self.min_chars.unwrap_or(defaults::MIN_CHARS),
    }
  }
}

/// Fully resolved visual configuration of the field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStyle {
  pub background: Color32,
  pub corner_radius: CornerRadius,
  pub hint_text: String,
  pub hint_color: Color32,
  pub text_color: Color32,
  pub max_lines: usize,
  pub padding: Margin,
  pub close_icon: String,
  pub country_code: Option<String>,
  pub min_chars: usize,
}

impl Default for FieldStyle {
  fn default() -> Self {
    StyleAttrs::default().resolve()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  #[test]
  fn empty_bag_resolves_to_documented_defaults() {
    let style = StyleAttrs::default().resolve();
    assert_eq!(style.background, defaults::BACKGROUND);
    assert_eq!(style.hint_text, defaults::HINT_TEXT);
    assert_eq!(style.hint_color, defaults::HINT_COLOR);
    assert_eq!(style.text_color, defaults::TEXT_COLOR);
    assert_eq!(style.max_lines, defaults::MAX_LINES);
    assert_eq!(style.padding, Margin::same(defaults::PADDING));
    assert_eq!(style.close_icon, defaults::CLOSE_ICON);
    assert_eq!(style.country_code, None);
    assert_eq!(style.min_chars, defaults::MIN_CHARS);
  }

  #[test]
  fn explicit_values_win_over_defaults() {
    let style = StyleAttrs {
      hint_text: Some("Where to?".to_string()),
      text_color: Some(Color32::RED),
      country_code: Some("de".to_string()),
      ..Default::default()
    }
    .resolve();

    assert_eq!(style.hint_text, "Where to?");
    assert_eq!(style.text_color, Color32::RED);
    assert_eq!(style.country_code.as_deref(), Some("de"));
  }

  #[rstest]
  #[case::left(StyleAttrs { padding: Some(4), padding_left: Some(12), ..Default::default() }, Margin { left: 12, top: 4, right: 4, bottom: 4 })]
  #[case::top(StyleAttrs { padding: Some(4), padding_top: Some(12), ..Default::default() }, Margin { left: 4, top: 12, right: 4, bottom: 4 })]
  #[case::right(StyleAttrs { padding: Some(4), padding_right: Some(12), ..Default::default() }, Margin { left: 4, top: 4, right: 12, bottom: 4 })]
  #[case::bottom(StyleAttrs { padding: Some(4), padding_bottom: Some(12), ..Default::default() }, Margin { left: 4, top: 4, right: 4, bottom: 12 })]
  fn per_side_padding_overrides_the_base(#[case] attrs: StyleAttrs, #[case] expected: Margin) {
    assert_eq!(attrs.resolve().padding, expected);
  }

  #[test]
  fn per_side_padding_without_base_uses_the_default_base() {
    let style = StyleAttrs {
      padding_right: Some(20),
      ..Default::default()
    }
    .resolve();

    assert_eq!(style.padding.right, 20);
    assert_eq!(style.padding.left, defaults::PADDING);
  }

  #[test]
  fn max_lines_is_clamped_to_at_least_one() {
    let style = StyleAttrs {
      max_lines: Some(0),
      ..Default::default()
    }
    .resolve();
    assert_eq!(style.max_lines, 1);
  }
}
