//! Layer toggles and category filter, derived from the panel's flat state

use super::colors::Legend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LABEL_SHOW_SPOTS: &str = "show spots";
pub const LABEL_MARKER_STYLE: &str = "marker style";
pub const LABEL_SHOW_REGIONS: &str = "show regions";
pub const LABEL_SHOW_BACKGROUND: &str = "show background";
pub const LABEL_SELECTION: &str = "gene selection";

/// One value in the panel's flat label → value mapping
#[derive(Debug, Clone, PartialEq)]
pub enum PanelValue {
    Toggle(bool),
    Choice(String),
    /// One flag per legend entry, in legend order
    Flags(Vec<bool>),
}

/// Full panel state as emitted on every change
pub type PanelValues = BTreeMap<String, PanelValue>;

/// Which layers are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerVisibility {
    pub spots: bool,
    pub regions: bool,
    pub background: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            spots: true,
            regions: true,
            background: true,
        }
    }
}

/// Spot markers are either filled discs or rings, never both
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    #[default]
    Spots,
    Circles,
}

impl MarkerStyle {
    pub fn label(self) -> &'static str {
        match self {
            MarkerStyle::Spots => "spots",
            MarkerStyle::Circles => "circles",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "spots" => Some(MarkerStyle::Spots),
            "circles" => Some(MarkerStyle::Circles),
            _ => None,
        }
    }
}

/// Per-category filter. Categories absent from the map are unselected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySelection {
    selected: BTreeMap<String, bool>,
}

impl CategorySelection {
    /// Every legend category selected
    pub fn all(legend: &Legend) -> Self {
        Self::from_flags(legend, &[])
    }

    /// Flags in legend order; missing trailing flags count as selected
    pub fn from_flags(legend: &Legend, flags: &[bool]) -> Self {
        let selected = legend
            .entries()
            .iter()
            .enumerate()
            .map(|(i, e)| (e.category.clone(), flags.get(i).copied().unwrap_or(true)))
            .collect();
        Self { selected }
    }

    pub fn is_selected(&self, category: &str) -> bool {
        self.selected.get(category).copied().unwrap_or(false)
    }

    pub fn set(&mut self, category: &str, on: bool) {
        if let Some(flag) = self.selected.get_mut(category) {
            *flag = on;
        }
    }

    /// Flags in legend order, for the panel
    pub fn flags(&self, legend: &Legend) -> Vec<bool> {
        legend
            .entries()
            .iter()
            .map(|e| self.is_selected(&e.category))
            .collect()
    }
}

/// Everything the frame composer reads from the panel
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    pub layers: LayerVisibility,
    pub marker_style: MarkerStyle,
    pub selection: CategorySelection,
}

impl SceneState {
    pub fn new(layers: LayerVisibility, marker_style: MarkerStyle, legend: &Legend) -> Self {
        Self {
            layers,
            marker_style,
            selection: CategorySelection::all(legend),
        }
    }

    /// Re-derive the whole state from the panel mapping.
    /// Labels missing from the mapping fall back to `defaults`.
    pub fn from_panel(values: &PanelValues, defaults: &SceneState, legend: &Legend) -> Self {
        let toggle = |label: &str, fallback: bool| match values.get(label) {
            Some(PanelValue::Toggle(on)) => *on,
            _ => fallback,
        };

        let marker_style = match values.get(LABEL_MARKER_STYLE) {
            Some(PanelValue::Choice(choice)) => {
                MarkerStyle::from_label(choice).unwrap_or(defaults.marker_style)
            }
            _ => defaults.marker_style,
        };

        let selection = match values.get(LABEL_SELECTION) {
            Some(PanelValue::Flags(flags)) => CategorySelection::from_flags(legend, flags),
            _ => defaults.selection.clone(),
        };

        Self {
            layers: LayerVisibility {
                spots: toggle(LABEL_SHOW_SPOTS, defaults.layers.spots),
                regions: toggle(LABEL_SHOW_REGIONS, defaults.layers.regions),
                background: toggle(LABEL_SHOW_BACKGROUND, defaults.layers.background),
            },
            marker_style,
            selection,
        }
    }

    /// The flat mapping that reproduces this state
    pub fn to_panel(&self, legend: &Legend) -> PanelValues {
        let mut values = PanelValues::new();
        values.insert(LABEL_SHOW_SPOTS.into(), PanelValue::Toggle(self.layers.spots));
        values.insert(
            LABEL_MARKER_STYLE.into(),
            PanelValue::Choice(self.marker_style.label().into()),
        );
        values.insert(LABEL_SHOW_REGIONS.into(), PanelValue::Toggle(self.layers.regions));
        values.insert(
            LABEL_SHOW_BACKGROUND.into(),
            PanelValue::Toggle(self.layers.background),
        );
        values.insert(
            LABEL_SELECTION.into(),
            PanelValue::Flags(self.selection.flags(legend)),
        );
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::colors::LegendConfig;
    use crate::scene::Point;
    use glam::Vec2;

    fn legend() -> Legend {
        let points: Vec<Point> = ["A", "A", "B", "C"]
            .iter()
            .map(|c| Point {
                position: Vec2::ZERO,
                radius: 1.0,
                category: c.to_string(),
                quality: 0.0,
            })
            .collect();
        Legend::rank(&points, LegendConfig { skip: 0, size: 9 })
    }

    #[test]
    fn test_from_panel() {
        let legend = legend();
        let defaults = SceneState::new(LayerVisibility::default(), MarkerStyle::Spots, &legend);

        let mut values = PanelValues::new();
        values.insert(LABEL_SHOW_SPOTS.into(), PanelValue::Toggle(false));
        values.insert(LABEL_MARKER_STYLE.into(), PanelValue::Choice("circles".into()));
        values.insert(LABEL_SHOW_REGIONS.into(), PanelValue::Toggle(true));
        values.insert(LABEL_SELECTION.into(), PanelValue::Flags(vec![true, false, true]));

        let state = SceneState::from_panel(&values, &defaults, &legend);
        assert!(!state.layers.spots);
        assert!(state.layers.regions);
        assert!(state.layers.background);
        assert_eq!(state.marker_style, MarkerStyle::Circles);
        assert!(state.selection.is_selected("A"));
        assert!(!state.selection.is_selected("B"));
        assert!(state.selection.is_selected("C"));
    }

    #[test]
    fn test_panel_roundtrip() {
        let legend = legend();
        let mut state = SceneState::new(LayerVisibility::default(), MarkerStyle::Circles, &legend);
        state.selection.set("C", false);
        state.layers.regions = false;

        let values = state.to_panel(&legend);
        let defaults = SceneState::new(LayerVisibility::default(), MarkerStyle::Spots, &legend);
        assert_eq!(SceneState::from_panel(&values, &defaults, &legend), state);
    }

    #[test]
    fn test_unknown_category_is_unselected() {
        let selection = CategorySelection::all(&legend());
        assert!(!selection.is_selected("not-in-legend"));
    }

    #[test]
    fn test_unknown_marker_style_keeps_default() {
        let legend = legend();
        let defaults = SceneState::new(LayerVisibility::default(), MarkerStyle::Circles, &legend);
        let mut values = PanelValues::new();
        values.insert(LABEL_MARKER_STYLE.into(), PanelValue::Choice("squares".into()));
        let state = SceneState::from_panel(&values, &defaults, &legend);
        assert_eq!(state.marker_style, MarkerStyle::Circles);
    }
}
