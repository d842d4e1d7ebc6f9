//! Legend ranking and per-point color assignment

use super::state::CategorySelection;
use super::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// sRGB color with channels in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self([
            ((hex >> 16) & 0xff) as f32 / 255.0,
            ((hex >> 8) & 0xff) as f32 / 255.0,
            (hex & 0xff) as f32 / 255.0,
        ])
    }

    /// Scale every channel by `0.7^k`
    pub fn darker(self, k: f32) -> Self {
        let f = DARKER.powf(k);
        Self(self.0.map(|c| (c * f).clamp(0.0, 1.0)))
    }

    pub fn to_array(self) -> [f32; 3] {
        self.0
    }

    pub fn to_color32(self) -> egui::Color32 {
        let [r, g, b] = self.0.map(|c| (c * 255.0).round() as u8);
        egui::Color32::from_rgb(r, g, b)
    }
}

const DARKER: f32 = 0.7;

/// Color of points outside the legend or deselected
pub const NEUTRAL: Rgb = Rgb::from_hex(0xafafaf);

/// Eight-color qualitative "Accent" palette
pub const ACCENT: [Rgb; 8] = [
    Rgb::from_hex(0x7fc97f),
    Rgb::from_hex(0xbeaed4),
    Rgb::from_hex(0xfdc086),
    Rgb::from_hex(0xffff99),
    Rgb::from_hex(0x386cb0),
    Rgb::from_hex(0xf0027f),
    Rgb::from_hex(0xbf5b17),
    Rgb::from_hex(0x666666),
];

/// Which categories make it into the legend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    /// Most frequent categories to drop (typically the unassigned label)
    pub skip: usize,
    /// Number of categories kept after skipping
    pub size: usize,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self { skip: 1, size: 9 }
    }
}

/// One legend row
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub category: String,
    pub count: usize,
    pub color: Rgb,
}

/// Ordered top categories with their palette colors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Legend {
    entries: Vec<LegendEntry>,
}

impl Legend {
    /// Rank categories by point count (descending, ties in first-seen order)
    pub fn rank(points: &[Point], config: LegendConfig) -> Self {
        // category -> (first seen, count)
        let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
        for (i, point) in points.iter().enumerate() {
            tally.entry(point.category.as_str()).or_insert((i, 0)).1 += 1;
        }
        let mut counts: Vec<(&str, usize, usize)> = tally
            .into_iter()
            .map(|(category, (first, count))| (category, first, count))
            .collect();
        counts.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

        let entries = counts
            .into_iter()
            .skip(config.skip)
            .take(config.size)
            .enumerate()
            .map(|(i, (category, _, count))| LegendEntry {
                category: category.to_string(),
                count,
                color: ACCENT[i % ACCENT.len()],
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[LegendEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Palette color for a category, `None` if it is not in the legend
    pub fn color_of(&self, category: &str) -> Option<Rgb> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.color)
    }
}

/// Per-point RGB, cached against the selection it was computed for
#[derive(Debug, Clone, Default)]
pub struct ColorAssignment {
    colors: Vec<[f32; 3]>,
    built_for: Option<CategorySelection>,
}

impl ColorAssignment {
    /// Recompute if `selection` differs from the cached one.
    /// Returns true when the colors changed and must be re-uploaded.
    pub fn refresh(&mut self, points: &[Point], legend: &Legend, selection: &CategorySelection) -> bool {
        if self.built_for.as_ref() == Some(selection) {
            return false;
        }
        self.colors = compute_colors(points, legend, selection);
        self.built_for = Some(selection.clone());
        tracing::debug!("Recomputed colors for {} points", self.colors.len());
        true
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }
}

fn compute_colors(points: &[Point], legend: &Legend, selection: &CategorySelection) -> Vec<[f32; 3]> {
    points
        .iter()
        .map(|point| {
            let base = match legend.color_of(&point.category) {
                Some(color) if selection.is_selected(&point.category) => color,
                _ => NEUTRAL,
            };
            base.darker(point.quality).to_array()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn point(category: &str, quality: f32) -> Point {
        Point {
            position: Vec2::ZERO,
            radius: 1.0,
            category: category.to_string(),
            quality,
        }
    }

    fn points() -> Vec<Point> {
        // "none" is the most frequent and gets skipped
        ["none", "none", "none", "B", "A", "A", "C", "B", "A"]
            .iter()
            .enumerate()
            .map(|(i, c)| point(c, i as f32 * 0.1))
            .collect()
    }

    #[test]
    fn test_hex() {
        assert_eq!(NEUTRAL.0, [175.0 / 255.0; 3]);
    }

    #[test]
    fn test_darker() {
        let c = Rgb([1.0, 0.5, 0.0]).darker(1.0);
        assert!((c.0[0] - 0.7).abs() < 1e-6);
        assert!((c.0[1] - 0.35).abs() < 1e-6);
        assert_eq!(Rgb([0.4, 0.4, 0.4]).darker(0.0), Rgb([0.4, 0.4, 0.4]));
        // Negative quality brightens but stays in range
        assert_eq!(Rgb([0.9, 0.9, 0.9]).darker(-5.0).0, [1.0; 3]);
    }

    #[test]
    fn test_rank_skips_most_frequent() {
        let legend = Legend::rank(&points(), LegendConfig::default());
        let names: Vec<_> = legend.entries().iter().map(|e| e.category.as_str()).collect();
        // A and none tie at 3; none was seen first so it ranks first and is skipped
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(legend.entries()[0].count, 3);
        assert_eq!(legend.color_of("A"), Some(ACCENT[0]));
        assert_eq!(legend.color_of("none"), None);
    }

    #[test]
    fn test_palette_wraps() {
        let pts: Vec<Point> = (0..10).map(|i| point(&format!("g{i}"), 0.0)).collect();
        let legend = Legend::rank(&pts, LegendConfig { skip: 0, size: 10 });
        assert_eq!(legend.len(), 10);
        // Equal counts keep first-seen order
        let names: Vec<_> = legend.entries().iter().map(|e| e.category.clone()).collect();
        let expected: Vec<_> = (0..10).map(|i| format!("g{i}")).collect();
        assert_eq!(names, expected);
        assert_eq!(legend.entries()[8].color, ACCENT[0]);
    }

    #[test]
    fn test_deselect_changes_only_that_category() {
        let pts = points();
        let legend = Legend::rank(&pts, LegendConfig::default());
        let mut selection = CategorySelection::all(&legend);

        let mut colors = ColorAssignment::default();
        assert!(colors.refresh(&pts, &legend, &selection));
        let before = colors.colors().to_vec();

        selection.set("B", false);
        assert!(colors.refresh(&pts, &legend, &selection));
        let after = colors.colors();

        for (i, p) in pts.iter().enumerate() {
            if p.category == "B" {
                assert_eq!(after[i], NEUTRAL.darker(p.quality).to_array());
                assert_ne!(after[i], before[i]);
            } else {
                assert_eq!(after[i], before[i]);
            }
        }
    }

    #[test]
    fn test_refresh_is_cached() {
        let pts = points();
        let legend = Legend::rank(&pts, LegendConfig::default());
        let selection = CategorySelection::all(&legend);
        let mut colors = ColorAssignment::default();

        assert!(colors.refresh(&pts, &legend, &selection));
        assert!(!colors.refresh(&pts, &legend, &selection));

        let mut narrowed = selection.clone();
        narrowed.set(&legend.entries()[0].category, false);
        assert!(colors.refresh(&pts, &legend, &narrowed));
    }

    #[test]
    fn test_off_legend_points_are_neutral() {
        let pts = points();
        let legend = Legend::rank(&pts, LegendConfig::default());
        let selection = CategorySelection::all(&legend);
        let mut colors = ColorAssignment::default();
        colors.refresh(&pts, &legend, &selection);
        assert_eq!(colors.colors()[0], NEUTRAL.to_array());
    }
}
