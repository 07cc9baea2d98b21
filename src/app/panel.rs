use crate::coords::CoordinateMapper;
use crate::geometry::{self, Direction, PatternAnalysis, patterns};
use crate::interaction::InputEvent;
use crate::model::{DrawingKind, DrawingStyle, LineStyle, Rgba};
use crate::render::RepaintReason;
use crate::store::{DrawingPatch, DrawingStore, drawing_label};
use eframe::egui;

use super::ChartApp;

fn color_row(ui: &mut egui::Ui, rgba: &mut Rgba) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        let presets = [
            egui::Color32::from_rgb(41, 98, 255),
            egui::Color32::from_rgb(242, 54, 69),
            egui::Color32::from_rgb(8, 153, 129),
            egui::Color32::from_rgb(255, 152, 0),
            egui::Color32::from_rgb(156, 39, 176),
            egui::Color32::from_rgb(220, 220, 220),
        ];
        for c in presets {
            if ui
                .add_sized([18.0, 18.0], egui::Button::new("").fill(c))
                .clicked()
            {
                *rgba = Rgba::from_color32(c);
                changed = true;
            }
        }
        let mut arr = [rgba.r, rgba.g, rgba.b, rgba.a];
        if ui.color_edit_button_srgba_unmultiplied(&mut arr).changed() {
            *rgba = Rgba {
                r: arr[0],
                g: arr[1],
                b: arr[2],
                a: arr[3],
            };
            changed = true;
        }
    });
    changed
}

fn style_editor(ui: &mut egui::Ui, id: &str, style: &mut DrawingStyle) -> bool {
    let mut changed = false;
    changed |= color_row(ui, &mut style.color);
    changed |= ui
        .add(egui::Slider::new(&mut style.width, 0.5..=8.0).text("Width"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut style.opacity, 0.1..=1.0).text("Opacity"))
        .changed();
    ui.horizontal(|ui| {
        ui.label("Line:");
        egui::ComboBox::from_id_salt(id)
            .selected_text(match style.dash {
                LineStyle::Solid => "Solid",
                LineStyle::Dashed => "Dashed",
                LineStyle::Dotted => "Dotted",
            })
            .show_ui(ui, |ui| {
                for (value, name) in [
                    (LineStyle::Solid, "Solid"),
                    (LineStyle::Dashed, "Dashed"),
                    (LineStyle::Dotted, "Dotted"),
                ] {
                    changed |= ui.selectable_value(&mut style.dash, value, name).changed();
                }
            });
    });
    changed
}

impl ChartApp {
    fn send(&mut self, event: InputEvent) {
        let mapper = CoordinateMapper::new(&self.viewport);
        let outcome = self.controller.handle(event, &mut self.store, &mapper);
        self.absorb(&outcome);
    }

    /// Applies an inspector edit unless a draft or drag owns the input.
    fn edit(&mut self, edit: impl FnOnce(&mut DrawingStore)) -> bool {
        let applied = self.controller.edit_store(&mut self.store, edit).is_some();
        if applied {
            self.renderer.request(RepaintReason::Data);
        }
        applied
    }

    pub(super) fn absorb(&mut self, outcome: &crate::interaction::Outcome) {
        if outcome.changed {
            self.renderer.request(RepaintReason::Data);
        } else if outcome.hover {
            self.renderer.request(RepaintReason::Hover);
        } else if outcome.repaint {
            self.renderer.request(RepaintReason::Interaction);
        }
        if let Some(id) = &outcome.committed {
            if let Some(d) = self.store.get(id) {
                self.status = Some(format!("Added {}", d.kind.display_name()));
            }
        }
        if outcome.removed.is_some() {
            self.status = Some("Drawing deleted".to_string());
        }
    }

    pub(super) fn tools_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tools");
        let active = self.controller.active_tool();
        if ui.selectable_label(active.is_none(), "Select").clicked() {
            self.send(InputEvent::Cancel);
        }
        egui::Grid::new("tool_grid").num_columns(2).show(ui, |ui| {
            for (i, kind) in DrawingKind::ALL.iter().enumerate() {
                if ui
                    .selectable_label(active == Some(*kind), kind.display_name())
                    .clicked()
                {
                    self.send(InputEvent::ArmTool(*kind));
                }
                if i % 2 == 1 {
                    ui.end_row();
                }
            }
        });

        ui.separator();
        ui.label("New drawing style");
        let mut style = self.settings.style;
        if style_editor(ui, "default_line_style", &mut style) {
            self.settings.style = style;
            self.apply_settings();
        }
        let mut fill_enabled = self.settings.fill_color.is_some();
        if ui.checkbox(&mut fill_enabled, "Fill shapes").changed() {
            self.settings.fill_color = fill_enabled.then(|| self.settings.style.color);
            self.apply_settings();
        }
        if let Some(mut fill) = self.settings.fill_color {
            let mut opacity = self.settings.fill_opacity;
            let mut changed = color_row(ui, &mut fill);
            changed |= ui
                .add(egui::Slider::new(&mut opacity, 0.0..=1.0).text("Fill opacity"))
                .changed();
            if changed {
                self.settings.fill_color = Some(fill);
                self.settings.fill_opacity = opacity;
                self.apply_settings();
            }
        }
    }

    pub(super) fn selection_ui(&mut self, ui: &mut egui::Ui) {
        let Some(selected) = self.store.selected().cloned() else {
            ui.label("Nothing selected");
            return;
        };
        let id = selected.id.clone();
        if self.label_for.as_deref() != Some(id.as_str()) {
            self.label_input = selected.label.clone().unwrap_or_default();
            self.label_for = Some(id.clone());
        }
        ui.heading(selected.kind.display_name());

        match patterns::analyze(selected.kind, &selected.points) {
            Some(PatternAnalysis::ElliottWave { direction, .. }) => {
                ui.label(match direction {
                    Direction::Bullish => "Bullish impulse",
                    Direction::Bearish => "Bearish impulse",
                });
            }
            Some(PatternAnalysis::HeadAndShoulders { inverse, .. }) => {
                ui.label(if inverse { "Inverse (bullish)" } else { "Top (bearish)" });
            }
            None => {}
        }
        if matches!(
            selected.kind,
            DrawingKind::LongPosition | DrawingKind::ShortPosition
        ) {
            match geometry::risk_reward(&selected.points) {
                Some(rr) => ui.label(format!("Risk/reward {rr:.2}")),
                None => ui.label("Risk/reward n/a"),
            };
        }
        for v in geometry::violations_for(&selected) {
            ui.colored_label(egui::Color32::from_rgb(242, 54, 69), v.message);
        }

        let held = self.controller.capture().is_held();
        ui.add_enabled_ui(!held, |ui| {
            ui.horizontal(|ui| {
                ui.label("Label:");
                let response = ui.text_edit_singleline(&mut self.label_input);
                if response.lost_focus() || ui.small_button("Set").clicked() {
                    let label = Some(self.label_input.trim().to_string()).filter(|l| !l.is_empty());
                    if label != selected.label {
                        self.edit(|store| store.update(&id, DrawingPatch::label(label)));
                    }
                }
            });

            let mut style = selected.style;
            if style_editor(ui, "selected_line_style", &mut style) {
                self.edit(|store| store.update(&id, DrawingPatch::style(style)));
            }
            if selected.kind.has_fill() {
                let mut fill = selected.fill_color.unwrap_or(style.color);
                let mut opacity = selected.fill_opacity.unwrap_or(0.2);
                let mut changed = color_row(ui, &mut fill);
                changed |= ui
                    .add(egui::Slider::new(&mut opacity, 0.0..=1.0).text("Fill opacity"))
                    .changed();
                if changed {
                    let patch = DrawingPatch {
                        fill_color: Some(Some(fill)),
                        fill_opacity: Some(Some(opacity)),
                        ..DrawingPatch::default()
                    };
                    self.edit(|store| store.update(&id, patch));
                }
            }

            ui.horizontal(|ui| {
                let mut locked = selected.locked;
                if ui.checkbox(&mut locked, "Locked").changed() {
                    self.edit(|store| store.set_locked(&id, locked));
                }
                let mut hidden = selected.hidden;
                if ui.checkbox(&mut hidden, "Hidden").changed() {
                    self.edit(|store| store.set_hidden(&id, hidden));
                }
            });
            ui.horizontal(|ui| {
                if ui.button("Bring to front").clicked() {
                    self.edit(|store| store.bring_to_front(&id));
                }
                if ui.button("Send to back").clicked() {
                    self.edit(|store| store.send_to_back(&id));
                }
                if ui.button("Delete").clicked()
                    && self.edit(|store| {
                        store.remove(&id);
                    })
                {
                    self.status = Some("Drawing deleted".to_string());
                }
            });
        });
    }

    pub(super) fn drawings_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading(format!("Drawings ({})", self.store.len()));
        let rows: Vec<(String, String, bool)> = self
            .store
            .sorted_by_z()
            .into_iter()
            .rev()
            .map(|d| (d.id.clone(), drawing_label(d), d.selected))
            .collect();
        egui::ScrollArea::vertical()
            .id_salt("drawings_list")
            .max_height(220.0)
            .show(ui, |ui| {
                for (id, label, selected) in rows {
                    if ui.selectable_label(selected, label).clicked() && self.controller.is_idle() {
                        self.store.select(Some(&id));
                        self.renderer.request(RepaintReason::Interaction);
                    }
                }
            });
        let held = self.controller.capture().is_held();
        if !self.store.is_empty()
            && ui.add_enabled(!held, egui::Button::new("Clear all")).clicked()
        {
            self.edit(DrawingStore::clear);
        }
    }

    pub(super) fn settings_ui(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;
        changed |= ui
            .add(egui::Slider::new(&mut self.settings.debounce_ms, 100..=5_000).text("Save delay (ms)"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut self.settings.handle_radius, 3.0..=16.0).text("Handle radius"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut self.settings.hit_tolerance, 1.0..=16.0).text("Hit tolerance"))
            .changed();
        ui.horizontal(|ui| {
            ui.label("Drawings directory:");
            ui.monospace(&self.settings.drawings_dir);
        });
        if changed {
            self.apply_settings();
        }
    }
}
