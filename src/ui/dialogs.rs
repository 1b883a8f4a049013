use eframe::egui;

use crate::app::{AnnotationApp, ClassAction};
use crate::session::ClassPickResult;

pub fn dialogs(app: &mut AnnotationApp, ctx: &egui::Context) {
    class_pick_window(app, ctx);
    class_manager_window(app, ctx);
    alert_window(app, ctx);
}

fn class_pick_window(app: &mut AnnotationApp, ctx: &egui::Context) {
    let Some(pending) = &mut app.pending_pick else {
        return;
    };
    let mut result = None;
    egui::Window::new("Choose class")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            let preview = &pending.request.preview;
            ui.label(format!(
                "x {:.6}  y {:.6}  w {:.6}  h {:.6}",
                preview.x_center, preview.y_center, preview.width, preview.height
            ));
            let selected_text = pending
                .request
                .options
                .iter()
                .find(|c| c.id == pending.choice)
                .map_or(String::new(), |c| format!("{} - {}", c.id, c.name));
            egui::ComboBox::from_id_salt("pick_class")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    for entry in &pending.request.options {
                        ui.selectable_value(
                            &mut pending.choice,
                            entry.id,
                            format!("{} - {}", entry.id, entry.name),
                        );
                    }
                });
            ui.horizontal(|ui| {
                if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    result = Some(ClassPickResult::Chosen(pending.choice));
                }
                if ui.button("Cancel").clicked() || ui.input(|i| i.key_pressed(egui::Key::Escape))
                {
                    result = Some(ClassPickResult::Cancelled);
                }
            });
        });
    if let Some(result) = result {
        app.resolve_pick(result);
    }
}

fn class_manager_window(app: &mut AnnotationApp, ctx: &egui::Context) {
    if !app.class_editor.open {
        return;
    }
    let Some(session) = app.controller.session() else {
        app.class_editor.open = false;
        return;
    };
    let editor = &mut app.class_editor;
    let mut action = None;
    let mut open = true;

    egui::Window::new("Classes")
        .collapsible(false)
        .open(&mut open)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .max_height(200.0)
                .show(ui, |ui| {
                    for entry in session.registry().entries() {
                        let selected = editor.selected.as_deref() == Some(entry.name.as_str());
                        if ui
                            .selectable_label(selected, format!("{} - {}", entry.id, entry.name))
                            .clicked()
                        {
                            editor.selected = Some(entry.name.clone());
                            editor.rename_to = entry.name.clone();
                            editor.confirm_remove = false;
                        }
                    }
                });

            ui.separator();
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut editor.new_name);
                if ui.button("Add").clicked() {
                    action = Some(ClassAction::Add(editor.new_name.clone()));
                }
            });

            if let Some(name) = editor.selected.clone() {
                ui.horizontal(|ui| {
                    ui.text_edit_singleline(&mut editor.rename_to);
                    if ui.button("Rename").clicked() {
                        action = Some(ClassAction::Rename(name.clone(), editor.rename_to.clone()));
                    }
                });
                if editor.confirm_remove {
                    ui.label(format!(
                        "Remove \"{}\"? Existing boxes keep its id and show as unknown.",
                        name
                    ));
                    ui.horizontal(|ui| {
                        if ui.button("Remove").clicked() {
                            action = Some(ClassAction::Remove(name.clone()));
                            editor.confirm_remove = false;
                        }
                        if ui.button("Keep").clicked() {
                            editor.confirm_remove = false;
                        }
                    });
                } else if ui.button("Remove...").clicked() {
                    editor.confirm_remove = true;
                }
            }

            ui.separator();
            if ui
                .button("Renumber ids")
                .on_hover_text("Make ids contiguous and rewrite every label file of the folder")
                .clicked()
            {
                action = Some(ClassAction::Renumber);
            }
        });

    if !open {
        app.class_editor = Default::default();
    }
    if let Some(action) = action {
        app.apply_class_action(action);
    }
}

fn alert_window(app: &mut AnnotationApp, ctx: &egui::Context) {
    let Some(alert) = &app.alert else {
        return;
    };
    let mut dismissed = false;
    egui::Window::new(alert.title.as_str())
        .id(egui::Id::new("alert"))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.label(alert.message.as_str());
            if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                dismissed = true;
            }
        });
    if dismissed {
        app.alert = None;
    }
}
