use eframe::egui;
use std::collections::HashMap;

use crate::app::AnnotationApp;
use crate::models::ClassId;

fn class_counts(ui: &mut egui::Ui, app: &AnnotationApp, counts: &HashMap<ClassId, usize>) {
    let mut classes: Vec<_> = counts.keys().copied().collect();
    classes.sort();
    for id in classes {
        ui.label(format!(
            "{} ({}): {}",
            app.controller.label_for(id),
            id,
            counts[&id]
        ));
    }
}

pub fn statistics_panel(app: &mut AnnotationApp, ctx: &egui::Context) {
    egui::SidePanel::right("statistics_panel")
        .default_width(200.0)
        .show(ctx, |ui| {
            let stats = &app.statistics;
            ui.heading("Statistics");
            ui.label(format!("Images: {}", stats.total_images));
            ui.label(format!("Annotated: {}", stats.annotated_images));
            if stats.total_images > 0 {
                ui.label(format!(
                    "Progress: {:.1}%",
                    stats.annotated_images as f32 / stats.total_images as f32 * 100.0
                ));
            }

            ui.separator();
            ui.heading("All images");
            class_counts(ui, app, &stats.total_class_counts);

            if !stats.current_class_counts.is_empty() {
                ui.separator();
                ui.heading("Current image");
                class_counts(ui, app, &stats.current_class_counts);
            }

            if let Some(pointer) = app.cursor_pixel {
                ui.separator();
                ui.label(format!("Cursor: {:.0}, {:.0} px", pointer.x, pointer.y));
            }

            ui.add_space((ui.available_height() - 30.0).max(0.0));
            if let Some((message, _)) = &app.status_message {
                ui.label(message);
            }
        });
}
