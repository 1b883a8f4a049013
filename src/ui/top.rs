use eframe::egui;
use std::path::PathBuf;

use crate::app::AnnotationApp;

pub fn top_panel(app: &mut AnnotationApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.button("Select image folder").clicked() {
                app.select_image_dir();
            }

            let mut reopen: Option<PathBuf> = None;
            let recent = &app.controller.config().recent_folders;
            ui.add_enabled_ui(!recent.is_empty(), |ui| {
                ui.menu_button("Recent", |ui| {
                    for folder in recent {
                        if ui.button(folder.display().to_string()).clicked() {
                            reopen = Some(folder.clone());
                            ui.close_menu();
                        }
                    }
                });
            });
            if let Some(folder) = reopen {
                app.open_folder(&folder);
            }

            ui.separator();
            let has_session = app.controller.session().is_some();
            if ui
                .add_enabled(app.controller.can_prev(), egui::Button::new("< Prev"))
                .clicked()
            {
                app.switch_image(false);
            }
            if ui
                .add_enabled(app.controller.can_next(), egui::Button::new("Next >"))
                .clicked()
            {
                app.switch_image(true);
            }
            if ui
                .add_enabled(has_session, egui::Button::new("Classes..."))
                .clicked()
            {
                app.class_editor.open = true;
            }
            ui.checkbox(&mut app.show_labels, "Show labels");

            ui.separator();
            ui.label(app.controller.status_text());
            if let Some(session) = app.controller.session() {
                ui.label(format!("Folder: {}", session.folder().display()))
                    .on_hover_text(format!("Labels: {}", session.store().label_dir().display()));
            }
        });
    });
}
