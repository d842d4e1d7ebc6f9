//! Control panel using egui
//!
//! The panel owns only its widget values. Every change is sent as the full
//! flat label → value mapping; the app re-derives the scene state from it.

mod stats;

pub use stats::*;

use crate::scene::{
    Legend, MarkerStyle, PanelValue, PanelValues, LABEL_MARKER_STYLE, LABEL_SELECTION,
    LABEL_SHOW_BACKGROUND, LABEL_SHOW_REGIONS, LABEL_SHOW_SPOTS,
};
use egui::{Color32, RichText};
use std::sync::mpsc::{channel, Receiver, Sender, TryIter};

/// Messages from the panel to the app
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// Full current panel state
    SelectionChanged(PanelValues),
    ResetCamera,
}

/// Read-only values shown in the footer
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelStatus {
    pub distance: f32,
    pub rotation: f32,
    pub points: usize,
    pub regions: usize,
}

/// Panel widget state and its outgoing event channel
pub struct Ui {
    values: PanelValues,
    legend: Legend,
    events_tx: Sender<PanelEvent>,
    events_rx: Receiver<PanelEvent>,
    clock: FrameClock,
}

impl Ui {
    pub fn new(legend: Legend, initial: PanelValues) -> Self {
        let (tx, rx) = channel();
        Self {
            values: initial,
            legend,
            events_tx: tx,
            events_rx: rx,
            clock: FrameClock::new(),
        }
    }

    pub fn values(&self) -> &PanelValues {
        &self.values
    }

    /// Pending events, in the order they were emitted
    pub fn events(&self) -> TryIter<'_, PanelEvent> {
        self.events_rx.try_iter()
    }

    pub fn record_frame(&mut self) {
        self.clock.tick();
    }

    /// Flip a checkbox, as if clicked
    pub fn toggle(&mut self, label: &str) {
        if let Some(PanelValue::Toggle(on)) = self.values.get_mut(label) {
            *on = !*on;
            self.emit();
        }
    }

    /// Switch between filled and ring markers
    pub fn cycle_marker_style(&mut self) {
        if let Some(PanelValue::Choice(choice)) = self.values.get_mut(LABEL_MARKER_STYLE) {
            let next = match MarkerStyle::from_label(choice) {
                Some(MarkerStyle::Spots) => MarkerStyle::Circles,
                _ => MarkerStyle::Spots,
            };
            *choice = next.label().to_string();
            self.emit();
        }
    }

    fn emit(&self) {
        tracing::debug!("Panel changed");
        // The receiver lives in self, so the send cannot fail
        let _ = self
            .events_tx
            .send(PanelEvent::SelectionChanged(self.values.clone()));
    }

    /// Draw the panel; emits an event if any widget changed
    pub fn show(&mut self, ctx: &egui::Context, status: &PanelStatus) {
        let mut changed = false;
        let mut reset = false;

        egui::Window::new("tissue-view")
            .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                for label in [LABEL_SHOW_SPOTS, LABEL_SHOW_REGIONS, LABEL_SHOW_BACKGROUND] {
                    if let Some(PanelValue::Toggle(on)) = self.values.get_mut(label) {
                        changed |= ui.checkbox(on, label).changed();
                    }
                }

                if let Some(PanelValue::Choice(choice)) = self.values.get_mut(LABEL_MARKER_STYLE) {
                    ui.horizontal(|ui| {
                        ui.label(LABEL_MARKER_STYLE);
                        for style in [MarkerStyle::Spots, MarkerStyle::Circles] {
                            let selected = choice.as_str() == style.label();
                            if ui.radio(selected, style.label()).clicked() && !selected {
                                *choice = style.label().to_string();
                                changed = true;
                            }
                        }
                    });
                }

                if let Some(PanelValue::Flags(flags)) = self.values.get_mut(LABEL_SELECTION) {
                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(LABEL_SELECTION).strong());
                        if ui.small_button("all").clicked() {
                            flags.iter_mut().for_each(|f| *f = true);
                            changed = true;
                        }
                        if ui.small_button("none").clicked() {
                            flags.iter_mut().for_each(|f| *f = false);
                            changed = true;
                        }
                    });
                    for (entry, flag) in self.legend.entries().iter().zip(flags.iter_mut()) {
                        ui.horizontal(|ui| {
                            let (rect, _) =
                                ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                            ui.painter().rect_filled(rect, 2.0, entry.color.to_color32());
                            changed |= ui.checkbox(flag, &entry.category).changed();
                            ui.label(RichText::new(entry.count.to_string()).small().weak());
                        });
                    }
                }

                ui.separator();
                ui.horizontal(|ui| {
                    ui.label(format!("Zoom: {:.2}", status.distance));
                    ui.label(format!("Rot: {:.0}°", status.rotation.to_degrees()));
                    ui.label(RichText::new(format!("{:.0} fps", self.clock.fps())).color(Color32::LIGHT_BLUE));
                });
                ui.label(
                    RichText::new(format!("{} spots, {} regions", status.points, status.regions))
                        .small()
                        .weak(),
                );
                if ui.button("Reset view (R)").clicked() {
                    reset = true;
                }
                ui.label(RichText::new("Drag: pan  Shift+drag: rotate  Scroll: zoom").small().weak());
            });

        if changed {
            self.emit();
        }
        if reset {
            let _ = self.events_tx.send(PanelEvent::ResetCamera);
        }
    }
}
