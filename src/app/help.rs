use crate::geometry;
use crate::interaction::TOOL_HOTKEYS;
use eframe::egui;

pub(super) fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Help & Shortcuts")
        .open(open)
        .resizable(true)
        .default_width(520.0)
        .default_height(480.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Keyboard Shortcuts");
                ui.separator();

                ui.label("General");
                help_row(ui, "F1", "Show this window");
                help_row(ui, "Escape", "Cancel drawing or drag / clear selection");
                help_row(ui, "Delete / Backspace", "Delete selected drawing");
                help_row(ui, "⇧L", "Lock or unlock selected drawing");
                help_row(ui, "⇧H", "Hide or show selected drawing");

                ui.add_space(10.0);
                ui.label("Tools");
                for (key, kind) in TOOL_HOTKEYS {
                    let points = geometry::handler(*kind).labels.len();
                    help_row(
                        ui,
                        key.name(),
                        &format!("{} ({points} clicks)", kind.display_name()),
                    );
                }

                ui.add_space(10.0);
                ui.label("Chart");
                help_row(ui, "Scroll wheel", "Zoom time axis");
                help_row(ui, "⌘ + scroll", "Zoom price axis");
                help_row(ui, "Right-drag", "Pan");
                help_row(ui, "Drag a handle", "Move that anchor of the selected drawing");

                ui.add_space(20.0);
                ui.heading("Saving");
                ui.separator();
                ui.label("• Drawings save automatically shortly after each change");
                ui.label("• One JSON file per symbol and timeframe in the drawings directory");
                ui.label("• Settings are stored in settings.toml");
                ui.label("• Shortcuts are ignored while a text field has focus");
            });
        });
}

fn help_row(ui: &mut egui::Ui, shortcut: &str, description: &str) {
    ui.horizontal(|ui| {
        ui.add_sized(
            [120.0, 16.0],
            egui::Label::new(egui::RichText::new(shortcut).monospace().strong()),
        );
        ui.label(description);
    });
}
