use eframe::egui;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::config::{self, AnnotatorConfig};
use crate::coords::FitTransform;
use crate::error::AnnotatorError;
use crate::models::{ClassId, Statistics};
use crate::session::{ClassPickRequest, ClassPickResult, DrawOutcome, SessionController};
use crate::ui;
use crate::utils::load_display_image;

/// A box waiting in the class picker, with the class currently chosen there.
pub struct PendingPick {
    pub request: ClassPickRequest,
    pub choice: ClassId,
}

/// Modal message window.
pub struct Alert {
    pub title: String,
    pub message: String,
}

#[derive(Default)]
pub struct ClassEditor {
    pub open: bool,
    pub selected: Option<String>,
    pub new_name: String,
    pub rename_to: String,
    pub confirm_remove: bool,
}

pub enum ClassAction {
    Add(String),
    Rename(String, String),
    Remove(String),
    Renumber,
}

pub struct AnnotationApp {
    pub controller: SessionController,
    pub texture: Option<egui::TextureHandle>,
    pub texture_path: Option<PathBuf>,
    pub drawing: Option<(egui::Pos2, egui::Pos2)>,
    pub selected_box: Option<usize>,
    pub status_message: Option<(String, f32)>,
    pub alert: Option<Alert>,
    pub pending_pick: Option<PendingPick>,
    pub class_editor: ClassEditor,
    pub statistics: Statistics,
    pub show_labels: bool,
    pub scroll_to_current: bool,
    pub cursor_pixel: Option<egui::Pos2>,
}

impl AnnotationApp {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            controller: SessionController::new(config),
            texture: None,
            texture_path: None,
            drawing: None,
            selected_box: None,
            status_message: None,
            alert: None,
            pending_pick: None,
            class_editor: ClassEditor::default(),
            statistics: Statistics::default(),
            show_labels: true,
            scroll_to_current: false,
            cursor_pixel: None,
        }
    }

    pub fn show_status(&mut self, message: &str) {
        self.status_message = Some((message.to_string(), 3.0));
    }

    /// Shows an error to the user. Nothing here is fatal.
    pub fn report(&mut self, err: AnnotatorError) {
        let title = match &err {
            AnnotatorError::Validation(_) => {
                warn!("{}", err);
                "Warning"
            }
            AnnotatorError::Parse { .. } => {
                warn!("{}", err);
                "Invalid file"
            }
            _ => {
                error!("{}", err);
                "Error"
            }
        };
        self.alert = Some(Alert {
            title: title.to_string(),
            message: err.to_string(),
        });
    }

    /// True while a window that must be answered first is showing.
    pub fn modal_open(&self) -> bool {
        self.alert.is_some() || self.pending_pick.is_some() || self.class_editor.open
    }

    pub fn refresh_statistics(&mut self) {
        self.statistics = self.controller.statistics();
    }

    pub fn select_image_dir(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Select image folder")
            .pick_folder()
        {
            self.open_folder(&path);
        }
    }

    pub fn open_folder(&mut self, path: &Path) {
        self.texture = None;
        self.texture_path = None;
        self.drawing = None;
        self.selected_box = None;
        self.pending_pick = None;
        self.scroll_to_current = true;

        match self.controller.select_folder(path) {
            Ok(report) => {
                self.show_status(&format!("Loaded {} images", report.image_count));
                if let Err(e) = config::save_config(self.controller.config()) {
                    warn!("{}", e);
                }
                if let Some(problem) = report.class_problem.or(report.label_problem) {
                    self.report(problem);
                }
            }
            Err(e) => {
                self.show_status("No images found");
                self.report(e);
            }
        }
        self.refresh_statistics();
    }

    /// Rebuilds the texture when the active image changed.
    pub fn ensure_texture(&mut self, ctx: &egui::Context) {
        let Some(path) = self.controller.session().map(|s| s.image_path()) else {
            self.texture = None;
            self.texture_path = None;
            return;
        };
        if self.texture_path.as_ref() == Some(&path) {
            return;
        }
        let limit = self.controller.config().max_texture_size;
        self.texture = match load_display_image(&path, limit) {
            Ok(image) => Some(ctx.load_texture("current_image", image, Default::default())),
            Err(e) => {
                error!("{}", e);
                self.show_status("Failed to load image");
                None
            }
        };
        self.texture_path = Some(path);
    }

    pub fn switch_image(&mut self, next: bool) {
        let moved = if next {
            self.controller.next_image()
        } else {
            self.controller.prev_image()
        };
        self.after_navigation(moved);
    }

    pub fn go_to_image(&mut self, index: usize) {
        let moved = self.controller.go_to_image(index);
        self.after_navigation(moved);
    }

    fn after_navigation(&mut self, moved: crate::error::Result<bool>) {
        match moved {
            Ok(true) => {
                self.selected_box = None;
                self.drawing = None;
                self.scroll_to_current = true;
                self.refresh_statistics();
            }
            Ok(false) => {}
            Err(e) => self.report(e),
        }
    }

    /// Hands a finished drag to the session and follows up on the outcome.
    pub fn finish_drawing(
        &mut self,
        drawn: egui::Rect,
        transform: &FitTransform,
        pixels_per_point: f32,
    ) {
        match self
            .controller
            .submit_drawn_rect(drawn, transform, pixels_per_point)
        {
            Ok(DrawOutcome::Discarded) => {}
            Ok(DrawOutcome::Committed(record)) => {
                let label = self.controller.label_for(record.class_id);
                self.show_status(&format!("Added {} box", label));
                self.selected_box = None;
                self.refresh_statistics();
            }
            Ok(DrawOutcome::NeedsClass(request)) => {
                let choice = request.options.first().map_or(0, |c| c.id);
                self.pending_pick = Some(PendingPick { request, choice });
            }
            Err(e) => self.report(e),
        }
    }

    pub fn resolve_pick(&mut self, result: ClassPickResult) {
        let Some(pending) = self.pending_pick.take() else {
            return;
        };
        match self.controller.resolve_class_pick(pending.request, result) {
            Ok(Some(record)) => {
                let label = self.controller.label_for(record.class_id);
                self.show_status(&format!("Added {} box", label));
                self.selected_box = None;
                self.refresh_statistics();
            }
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    pub fn set_preselected_class(&mut self, class_id: Option<ClassId>) {
        if let Err(e) = self.controller.set_preselected_class(class_id) {
            self.report(e);
        }
    }

    pub fn delete_selected_box(&mut self) {
        let Some(selected) = self.selected_box.and_then(|idx| {
            self.controller
                .session()
                .and_then(|s| s.boxes().get(idx).cloned())
        }) else {
            return;
        };
        self.selected_box = None;
        match self.controller.delete_current_selection(&selected) {
            Ok(()) => {
                self.show_status("Deleted box");
                self.refresh_statistics();
            }
            Err(e) => self.report(e),
        }
    }

    /// Deletes every record of the active image with the same text as `line_text`.
    pub fn delete_identical_boxes(&mut self, line_text: &str) {
        self.selected_box = None;
        match self.controller.delete_matching(line_text) {
            Ok(removed) => {
                self.show_status(&format!("Deleted {} box(es)", removed));
                self.refresh_statistics();
            }
            Err(e) => self.report(e),
        }
    }

    pub fn apply_class_action(&mut self, action: ClassAction) {
        let result = match action {
            ClassAction::Add(name) => self.controller.add_class(&name).map(|id| {
                self.class_editor.new_name.clear();
                format!("Added class {}", id)
            }),
            ClassAction::Rename(old, new) => self.controller.rename_class(&old, &new).map(|_| {
                self.class_editor.selected = Some(new.trim().to_string());
                self.class_editor.rename_to.clear();
                format!("Renamed \"{}\"", old)
            }),
            ClassAction::Remove(name) => self.controller.remove_class(&name).map(|entry| {
                self.class_editor.selected = None;
                format!("Removed class {} \"{}\"", entry.id, entry.name)
            }),
            ClassAction::Renumber => self
                .controller
                .renumber_classes()
                .map(|mapping| format!("Renumbered {} class id(s)", mapping.len())),
        };
        match result {
            Ok(message) => {
                info!("{}", message);
                self.show_status(&message);
                self.refresh_statistics();
            }
            Err(e) => self.report(e),
        }
    }

    pub fn save_settings(&self) {
        if let Err(e) = config::save_config(self.controller.config()) {
            error!("{}", e);
        }
    }
}

impl eframe::App for AnnotationApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some((_, remaining)) = &mut self.status_message {
            *remaining -= ctx.input(|i| i.stable_dt);
            if *remaining <= 0.0 {
                self.status_message = None;
            } else {
                ctx.request_repaint();
            }
        }

        ui::top_panel(self, ctx);
        ui::side_panel(self, ctx);
        ui::statistics_panel(self, ctx);
        ui::central_panel(self, ctx);
        ui::dialogs(self, ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.save_settings();
    }
}
