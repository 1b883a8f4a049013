use eframe::egui;

use crate::app::AnnotationApp;
use crate::coords::{FitTransform, normalized_to_image};
use crate::models::ClassId;

const PALETTE: [egui::Color32; 6] = [
    egui::Color32::from_rgb(230, 60, 60),
    egui::Color32::from_rgb(60, 170, 230),
    egui::Color32::from_rgb(90, 200, 90),
    egui::Color32::from_rgb(230, 160, 40),
    egui::Color32::from_rgb(180, 90, 220),
    egui::Color32::from_rgb(40, 200, 190),
];

fn class_color(id: ClassId) -> egui::Color32 {
    PALETTE[id as usize % PALETTE.len()]
}

fn handle_keys(app: &mut AnnotationApp, ctx: &egui::Context) {
    if app.modal_open() || ctx.wants_keyboard_input() {
        return;
    }
    if ctx.input(|i| i.key_pressed(egui::Key::A) || i.key_pressed(egui::Key::ArrowLeft)) {
        app.switch_image(false);
    }
    if ctx.input(|i| i.key_pressed(egui::Key::D) || i.key_pressed(egui::Key::ArrowRight)) {
        app.switch_image(true);
    }
    if ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
        app.delete_selected_box();
    }
    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.drawing = None;
        app.selected_box = None;
    }
}

pub fn central_panel(app: &mut AnnotationApp, ctx: &egui::Context) {
    handle_keys(app, ctx);
    app.ensure_texture(ctx);

    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(session) = app.controller.session() else {
            ui.centered_and_justified(|ui| ui.label("Select a folder to start."));
            return;
        };
        let (Some(texture), Some(size)) = (&app.texture, session.image_size()) else {
            ui.centered_and_justified(|ui| {
                ui.label(format!("Cannot display {}", session.image_name()))
            });
            return;
        };

        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let Some(transform) = FitTransform::fit(size, response.rect) else {
            return;
        };
        painter.image(
            texture.id(),
            transform.image_area(),
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let boxes: Vec<(egui::Rect, ClassId, String)> = session
            .boxes()
            .iter()
            .map(|stored| {
                let id = stored.record.class_id;
                let pixels = normalized_to_image(&stored.record.normalized(), size);
                (
                    transform.image_to_display(pixels),
                    id,
                    session.registry().label_for(id),
                )
            })
            .collect();
        let pending = app
            .pending_pick
            .as_ref()
            .filter(|p| p.request.image_name == session.image_name())
            .map(|p| transform.image_to_display(p.request.rect));

        for (i, (rect, id, label)) in boxes.iter().enumerate() {
            let selected = app.selected_box == Some(i);
            let color = class_color(*id);
            let width = if selected { 3.0 } else { 2.0 };
            if selected {
                painter.rect_filled(*rect, 0.0, color.gamma_multiply(0.2));
            }
            painter.rect_stroke(
                *rect,
                0.0,
                egui::Stroke::new(width, color),
                egui::StrokeKind::Middle,
            );
            if app.show_labels {
                let galley = painter.layout_no_wrap(
                    label.clone(),
                    egui::FontId::proportional(13.0),
                    egui::Color32::WHITE,
                );
                let label_rect = egui::Rect::from_min_size(
                    rect.min - egui::vec2(0.0, galley.size().y),
                    galley.size(),
                )
                .expand(1.0);
                painter.rect_filled(label_rect, 0.0, color);
                painter.galley(label_rect.min + egui::vec2(1.0, 1.0), galley, egui::Color32::WHITE);
            }
        }
        if let Some(rect) = pending {
            painter.rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(2.0, egui::Color32::WHITE),
                egui::StrokeKind::Middle,
            );
        }

        app.cursor_pixel = response
            .hover_pos()
            .filter(|p| transform.image_area().contains(*p))
            .map(|p| transform.display_point_to_image(p));

        if app.modal_open() {
            app.drawing = None;
            return;
        }

        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                app.drawing = Some((pos, pos));
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            if let (Some((_, end)), Some(pos)) = (&mut app.drawing, response.interact_pointer_pos()) {
                *end = pos;
            }
        }
        if let Some((start, end)) = app.drawing {
            painter.rect_stroke(
                egui::Rect::from_two_pos(start, end),
                0.0,
                egui::Stroke::new(2.0, egui::Color32::YELLOW),
                egui::StrokeKind::Middle,
            );
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            if let Some((start, end)) = app.drawing.take() {
                let pixels_per_point = ui.ctx().pixels_per_point();
                app.finish_drawing(
                    egui::Rect::from_two_pos(start, end),
                    &transform,
                    pixels_per_point,
                );
            }
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                // topmost box wins
                let hit = boxes.iter().rposition(|(rect, _, _)| rect.contains(pos));
                app.selected_box = if hit == app.selected_box { None } else { hit };
            }
        }
        if response.secondary_clicked() {
            app.drawing = None;
            app.selected_box = None;
        }
    });
}
