use eframe::egui;

use crate::app::AnnotationApp;

pub fn side_panel(app: &mut AnnotationApp, ctx: &egui::Context) {
    egui::SidePanel::left("side_panel")
        .default_width(220.0)
        .show(ctx, |ui| {
            let Some(session) = app.controller.session() else {
                ui.label("No folder open.");
                return;
            };

            let mut go_to = None;
            let mut select_box = None;
            let mut delete = false;
            let mut delete_text: Option<String> = None;
            let mut preselect = app.controller.preselected_class();
            let current = session.index();

            ui.heading("Images");
            egui::ScrollArea::vertical()
                .id_salt("image_list")
                .max_height(ui.available_height() * 0.4)
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    for (i, name) in session.images().iter().enumerate() {
                        let response = ui.selectable_label(i == current, name.as_str());
                        if response.clicked() {
                            go_to = Some(i);
                        }
                        if i == current && app.scroll_to_current {
                            response.scroll_to_me(Some(egui::Align::Center));
                        }
                    }
                });

            ui.separator();
            ui.heading("Boxes");
            egui::ScrollArea::vertical()
                .id_salt("box_list")
                .max_height(ui.available_height() * 0.6)
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    if session.boxes().is_empty() {
                        ui.weak("No boxes in this image.");
                    }
                    for (i, stored) in session.boxes().iter().enumerate() {
                        let id = stored.record.class_id;
                        let text = format!("ID: {} - {}", id, session.registry().label_for(id));
                        let selected = app.selected_box == Some(i);
                        let response = ui
                            .selectable_label(selected, text)
                            .on_hover_text(stored.text.as_str());
                        if response.clicked() {
                            select_box = Some(if selected { None } else { Some(i) });
                        }
                        response.context_menu(|ui| {
                            if ui.button("Delete identical boxes").clicked() {
                                delete_text = Some(stored.text.clone());
                                ui.close_menu();
                            }
                        });
                    }
                });
            if ui
                .add_enabled(app.selected_box.is_some(), egui::Button::new("Delete box"))
                .clicked()
            {
                delete = true;
            }

            ui.separator();
            ui.heading("Class for new boxes");
            let selected_text = match preselect {
                Some(id) => session.registry().label_for(id),
                None => "Ask each time".to_string(),
            };
            egui::ComboBox::from_id_salt("preselected_class")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut preselect, None, "Ask each time");
                    for entry in session.registry().entries() {
                        ui.selectable_value(
                            &mut preselect,
                            Some(entry.id),
                            format!("{} - {}", entry.id, entry.name),
                        );
                    }
                });

            app.scroll_to_current = false;
            if preselect != app.controller.preselected_class() {
                app.set_preselected_class(preselect);
            }
            if let Some(selection) = select_box {
                app.selected_box = selection;
            }
            if delete {
                app.delete_selected_box();
            }
            if let Some(text) = delete_text {
                app.delete_identical_boxes(&text);
            }
            if let Some(index) = go_to {
                app.go_to_image(index);
            }
        });
}
