use eframe::egui::Rect;
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classes::ClassRegistry;
use crate::config::AnnotatorConfig;
use crate::coords::{FitTransform, ImageSize, NormalizedBox, PixelRect, image_to_normalized};
use crate::error::{AnnotatorError, Result, ValidationError};
use crate::labels::AnnotationStore;
use crate::models::{BoxRecord, ClassEntry, ClassId, Statistics, StoredBox};

/// State of one opened image folder.
#[derive(Debug, Clone)]
pub struct ImageSession {
    folder: PathBuf,
    images: Vec<String>,
    index: usize,
    registry: ClassRegistry,
    classes_path: PathBuf,
    store: AnnotationStore,
    boxes: Vec<StoredBox>,
    image_size: Option<ImageSize>,
}

impl ImageSession {
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image_name(&self) -> &str {
        &self.images[self.index]
    }

    pub fn image_path(&self) -> PathBuf {
        self.folder.join(self.image_name())
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn boxes(&self) -> &[StoredBox] {
        &self.boxes
    }

    /// Original dimensions of the active image, if they could be read.
    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    fn require_image_size(&mut self) -> Result<ImageSize> {
        if let Some(size) = self.image_size {
            return Ok(size);
        }
        let size = read_image_size(&self.image_path())?;
        self.image_size = Some(size);
        Ok(size)
    }

    /// Re-reads the active image's dimensions and records.
    fn reload(&mut self) -> Result<()> {
        let path = self.image_path();
        self.image_size = match read_image_size(&path) {
            Ok(size) => Some(size),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        match self.store.load_for_image(self.image_name()) {
            Ok(boxes) => {
                self.boxes = boxes;
                Ok(())
            }
            Err(e) => {
                self.boxes.clear();
                error!("{}", e);
                Err(e)
            }
        }
    }

    /// Applies `edit` to a copy of the registry and keeps it only once saved.
    fn edit_registry<T>(
        &mut self,
        edit: impl FnOnce(&mut ClassRegistry) -> Result<T>,
    ) -> Result<T> {
        let mut registry = self.registry.clone();
        let out = edit(&mut registry)?;
        registry.save(&self.classes_path)?;
        self.registry = registry;
        Ok(out)
    }
}

/// Problems met while opening a folder that did not stop it from opening.
#[derive(Debug, Default)]
pub struct OpenReport {
    pub image_count: usize,
    /// Class file unreadable or defaults not written; registry may be empty.
    pub class_problem: Option<AnnotatorError>,
    /// Label file of the first image unreadable.
    pub label_problem: Option<AnnotatorError>,
}

/// A drawn box waiting for the user to choose its class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPickRequest {
    pub image_name: String,
    pub rect: PixelRect,
    pub preview: NormalizedBox,
    pub options: Vec<ClassEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassPickResult {
    Chosen(ClassId),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    /// Too small or outside the image; nothing written.
    Discarded,
    Committed(BoxRecord),
    NeedsClass(ClassPickRequest),
}

/// Owns the single active [`ImageSession`] and dispatches user actions to it.
#[derive(Debug, Clone)]
pub struct SessionController {
    config: AnnotatorConfig,
    session: Option<ImageSession>,
    preselected: Option<ClassId>,
}

impl SessionController {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            config,
            session: None,
            preselected: None,
        }
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&ImageSession> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> Result<&mut ImageSession> {
        self.session
            .as_mut()
            .ok_or_else(|| ValidationError::NoSession.into())
    }

    fn session_ref(&self) -> Result<&ImageSession> {
        self.session
            .as_ref()
            .ok_or_else(|| ValidationError::NoSession.into())
    }

    /// Opens `folder` as the working folder.
    ///
    /// A folder without images closes the current session and writes nothing.
    /// Otherwise the label subfolder is created, the class list is loaded (or
    /// seeded with the configured defaults) and the first image becomes active.
    pub fn select_folder(&mut self, folder: &Path) -> Result<OpenReport> {
        let images = list_images(folder, &self.config)?;
        if images.is_empty() {
            warn!("No images in {:?}", folder);
            self.close();
            return Err(ValidationError::NoImages(folder.to_path_buf()).into());
        }

        let label_dir = folder.join(&self.config.label_dir_name);
        fs::create_dir_all(&label_dir)
            .map_err(|e| AnnotatorError::io("create label folder", &label_dir, e))?;

        let classes_path = folder.join(&self.config.classes_file);
        let (registry, class_problem) =
            ClassRegistry::load(&classes_path, &self.config.default_classes);

        let mut session = ImageSession {
            folder: folder.to_path_buf(),
            images,
            index: 0,
            registry,
            classes_path,
            store: AnnotationStore::new(label_dir),
            boxes: Vec::new(),
            image_size: None,
        };
        let label_problem = session.reload().err();
        info!(
            "Opened {:?}: {} images, {} classes",
            folder,
            session.images.len(),
            session.registry.len()
        );

        let report = OpenReport {
            image_count: session.images.len(),
            class_problem,
            label_problem,
        };
        self.session = Some(session);
        self.preselected = None;
        self.config.add_recent_folder(folder);
        Ok(report)
    }

    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Closed {:?}", session.folder);
        }
        self.preselected = None;
    }

    pub fn preselected_class(&self) -> Option<ClassId> {
        self.preselected
    }

    /// Sets the class used to commit boxes without asking; `None` turns it off.
    pub fn set_preselected_class(&mut self, class_id: Option<ClassId>) -> Result<()> {
        if let Some(id) = class_id {
            if self.session_ref()?.registry.name_of(id).is_none() {
                return Err(ValidationError::UnknownClassId(id).into());
            }
        }
        debug!("Preselected class: {:?}", class_id);
        self.preselected = class_id;
        Ok(())
    }

    pub fn can_prev(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.index > 0)
    }

    pub fn can_next(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |s| s.index + 1 < s.images.len())
    }

    /// Moves to the next image; returns whether the index changed.
    pub fn next_image(&mut self) -> Result<bool> {
        let target = match &self.session {
            Some(s) if s.index + 1 < s.images.len() => s.index + 1,
            _ => return Ok(false),
        };
        self.go_to_image(target)
    }

    pub fn prev_image(&mut self) -> Result<bool> {
        let target = match &self.session {
            Some(s) if s.index > 0 => s.index - 1,
            _ => return Ok(false),
        };
        self.go_to_image(target)
    }

    pub fn go_to_image(&mut self, index: usize) -> Result<bool> {
        let session = self.session_mut()?;
        if index >= session.images.len() || index == session.index {
            return Ok(false);
        }
        session.index = index;
        debug!("Active image: {}", session.image_name());
        session.reload()?;
        Ok(true)
    }

    /// Handles a rectangle the user finished drawing on the canvas.
    ///
    /// `min_box_size` is in physical pixels, so it is divided by
    /// `pixels_per_point` before comparing with the display-point rectangle.
    pub fn submit_drawn_rect(
        &mut self,
        drawn: Rect,
        transform: &FitTransform,
        pixels_per_point: f32,
    ) -> Result<DrawOutcome> {
        self.session_ref()?;
        let min_size = self.config.min_box_size / pixels_per_point.max(f32::EPSILON);
        match transform.display_to_image(drawn, min_size) {
            Some(rect) => self.submit_pixel_rect(rect),
            None => {
                debug!("Discarded drawn rectangle {:?}", drawn);
                Ok(DrawOutcome::Discarded)
            }
        }
    }

    /// Commits with the preselected class, or asks for one.
    pub fn submit_pixel_rect(&mut self, rect: PixelRect) -> Result<DrawOutcome> {
        let preselected = self.preselected;
        let session = self.session_mut()?;
        if let Some(id) = preselected.filter(|id| session.registry.name_of(*id).is_some()) {
            return self.commit_box(rect, id).map(DrawOutcome::Committed);
        }
        if session.registry.is_empty() {
            warn!("Box drawn with no classes defined");
            return Err(ValidationError::NoClasses.into());
        }
        let size = session.require_image_size()?;
        Ok(DrawOutcome::NeedsClass(ClassPickRequest {
            image_name: session.image_name().to_string(),
            rect,
            preview: image_to_normalized(rect, size),
            options: session.registry.entries().to_vec(),
        }))
    }

    /// Finishes a [`ClassPickRequest`]. `Cancelled` writes nothing.
    pub fn resolve_class_pick(
        &mut self,
        request: ClassPickRequest,
        result: ClassPickResult,
    ) -> Result<Option<BoxRecord>> {
        let ClassPickResult::Chosen(class_id) = result else {
            debug!("Class pick cancelled");
            return Ok(None);
        };
        let session = self.session_mut()?;
        if session.registry.name_of(class_id).is_none() {
            return Err(ValidationError::UnknownClassId(class_id).into());
        }
        let record = BoxRecord::new(class_id, request.preview);
        session.store.append(&request.image_name, &record)?;
        if session.image_name() == request.image_name {
            session.reload()?;
        }
        Ok(Some(record))
    }

    /// Normalizes `rect` against the active image and appends it.
    pub fn commit_box(&mut self, rect: PixelRect, class_id: ClassId) -> Result<BoxRecord> {
        let session = self.session_mut()?;
        if session.registry.name_of(class_id).is_none() {
            return Err(ValidationError::UnknownClassId(class_id).into());
        }
        let size = session.require_image_size()?;
        let record = BoxRecord::new(class_id, image_to_normalized(rect, size));
        let image_name = session.image_name().to_string();
        session.store.append(&image_name, &record)?;
        session.reload()?;
        Ok(record)
    }

    /// Deletes the one record the user selected.
    pub fn delete_current_selection(&mut self, selected: &StoredBox) -> Result<()> {
        let session = self.session_mut()?;
        let image_name = session.image_name().to_string();
        let result = session.store.delete_record(&image_name, selected);
        session.reload()?;
        result
    }

    /// Deletes every record of the active image whose text equals `line_text`.
    pub fn delete_matching(&mut self, line_text: &str) -> Result<usize> {
        let session = self.session_mut()?;
        let image_name = session.image_name().to_string();
        let removed = session.store.delete(&image_name, line_text)?;
        session.reload()?;
        Ok(removed)
    }

    /// Adds a class whose id is unused by the registry and by every label file,
    /// so records left behind by removed classes never change meaning.
    pub fn add_class(&mut self, name: &str) -> Result<ClassId> {
        let session = self.session_mut()?;
        let floor = match session.store.used_class_ids()?.last() {
            Some(max) => max.checked_add(1).ok_or(ValidationError::NoFreeClassId)?,
            None => 0,
        };
        let id = session.edit_registry(|r| r.add_above(name, floor))?;
        info!("Added class {} \"{}\"", id, name.trim());
        Ok(id)
    }

    pub fn rename_class(&mut self, old_name: &str, new_name: &str) -> Result<ClassId> {
        let id = self
            .session_mut()?
            .edit_registry(|r| r.rename(old_name, new_name))?;
        info!("Renamed class {} \"{}\" to \"{}\"", id, old_name, new_name.trim());
        Ok(id)
    }

    /// Removes a class; records using its id keep it and show as unknown.
    pub fn remove_class(&mut self, name: &str) -> Result<ClassEntry> {
        let removed = self.session_mut()?.edit_registry(|r| r.remove(name))?;
        if self.preselected == Some(removed.id) {
            self.preselected = None;
        }
        info!("Removed class {} \"{}\"", removed.id, removed.name);
        Ok(removed)
    }

    /// Compacts class ids and rewrites every label file of the folder to match.
    ///
    /// Ids still carried by records of removed classes are never handed out.
    /// Label files are rewritten before the class file is saved; if that save
    /// fails they are put back and nothing changes.
    pub fn renumber_classes(&mut self) -> Result<HashMap<ClassId, ClassId>> {
        let session = self.session_mut()?;
        let orphaned: BTreeSet<ClassId> = session
            .store
            .used_class_ids()?
            .into_iter()
            .filter(|id| session.registry.name_of(*id).is_none())
            .collect();
        let mut registry = session.registry.clone();
        let mapping = registry.renumber_around(&orphaned);
        let backup = session.store.remap_classes(&mapping)?;
        if let Err(e) = registry.save(&session.classes_path) {
            if let Err(restore_err) = backup.restore() {
                error!("{}", restore_err);
            }
            return Err(e);
        }
        session.registry = registry;
        session.reload()?;
        if let Some(id) = self.preselected {
            self.preselected = Some(mapping.get(&id).copied().unwrap_or(id));
        }
        info!("Renumbered {} class id(s)", mapping.len());
        Ok(mapping)
    }

    pub fn label_for(&self, class_id: ClassId) -> String {
        match &self.session {
            Some(session) => session.registry.label_for(class_id),
            None => format!("ID:{}?", class_id),
        }
    }

    /// `"Image i/n: name"` for the status line.
    pub fn status_text(&self) -> String {
        match &self.session {
            Some(s) => format!("Image {}/{}: {}", s.index + 1, s.images.len(), s.image_name()),
            None => "Select a folder to start.".to_string(),
        }
    }

    /// Counts records per class for the active image and the whole folder.
    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics::default();
        let Some(session) = &self.session else {
            return stats;
        };
        stats.total_images = session.images.len();
        for b in &session.boxes {
            *stats.current_class_counts.entry(b.record.class_id).or_insert(0) += 1;
        }
        for name in &session.images {
            let boxes = match session.store.load_for_image(name) {
                Ok(boxes) => boxes,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            if !boxes.is_empty() {
                stats.annotated_images += 1;
            }
            for b in boxes {
                *stats.total_class_counts.entry(b.record.class_id).or_insert(0) += 1;
            }
        }
        stats
    }
}

/// Image file names in `folder`, sorted.
pub fn list_images(folder: &Path, config: &AnnotatorConfig) -> Result<Vec<String>> {
    let entries = fs::read_dir(folder).map_err(|e| AnnotatorError::io("list", folder, e))?;
    let mut images: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && config.is_image_file(path))
        .filter_map(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|s| s.to_string())
        })
        .collect();
    images.sort();
    Ok(images)
}

fn read_image_size(path: &Path) -> Result<ImageSize> {
    let (width, height) = image::image_dimensions(path).map_err(|source| AnnotatorError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ImageSize::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    fn write_image(dir: &Path, name: &str, width: u32, height: u32) {
        image::RgbImage::new(width, height)
            .save(dir.join(name))
            .expect("write image");
    }

    fn open(dir: &Path) -> SessionController {
        let mut controller = SessionController::new(AnnotatorConfig::default());
        controller.select_folder(dir).expect("open folder");
        controller
    }

    fn rect(left: i32, top: i32, width: i32, height: i32) -> PixelRect {
        PixelRect {
            left,
            top,
            width,
            height,
        }
    }

    fn label_file(dir: &Path, image: &str) -> PathBuf {
        dir.join("Yolov8")
            .join(Path::new(image).with_extension("txt"))
    }

    #[test]
    fn empty_folder_is_rejected_without_writing() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("notes.txt"), "hi").expect("write");
        let mut controller = SessionController::new(AnnotatorConfig::default());

        let err = controller.select_folder(temp.path()).unwrap_err();
        assert!(matches!(
            err,
            AnnotatorError::Validation(ValidationError::NoImages(_))
        ));
        assert!(controller.session().is_none());
        assert!(!temp.path().join("Yolov8").exists());
        assert!(!temp.path().join("classes.csv").exists());
        assert_eq!(controller.status_text(), "Select a folder to start.");
    }

    #[test]
    fn first_open_writes_default_classes() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "img1.jpg", 64, 48);

        let mut controller = SessionController::new(AnnotatorConfig::default());
        let report = controller.select_folder(temp.path()).expect("open");
        assert_eq!(report.image_count, 1);
        assert!(report.class_problem.is_none());
        assert!(temp.path().join("Yolov8").is_dir());
        assert_eq!(
            fs::read_to_string(temp.path().join("classes.csv")).expect("read"),
            "0,person\n1,fish\n"
        );

        let session = controller.session().expect("session");
        assert_eq!(session.image_size(), Some(ImageSize::new(64, 48)));
        assert_eq!(controller.status_text(), "Image 1/1: img1.jpg");
        assert_eq!(controller.config().recent_folders[0], temp.path());
    }

    #[test]
    fn images_are_filtered_and_sorted() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for name in ["d.JPEG", "b.PNG", "a.jpg", "c.txt", "e.gif"] {
            fs::write(temp.path().join(name), b"x").expect("write");
        }
        fs::create_dir(temp.path().join("f.png")).expect("mkdir");

        let images = list_images(temp.path(), &AnnotatorConfig::default()).expect("list");
        assert_eq!(images, vec!["a.jpg", "b.PNG", "d.JPEG"]);
    }

    #[test]
    fn navigation_stops_at_both_ends() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        write_image(temp.path(), "b.png", 20, 10);
        let mut controller = open(temp.path());

        assert!(!controller.can_prev());
        assert!(!controller.prev_image().expect("prev"));
        assert!(controller.next_image().expect("next"));
        assert_eq!(controller.status_text(), "Image 2/2: b.png");
        assert_eq!(
            controller.session().and_then(|s| s.image_size()),
            Some(ImageSize::new(20, 10))
        );
        assert!(!controller.can_next());
        assert!(!controller.next_image().expect("next"));
        assert!(controller.prev_image().expect("prev"));
        assert_eq!(controller.session().map(|s| s.index()), Some(0));
    }

    #[test]
    fn tiny_rectangle_is_discarded() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 100, 100);
        let mut controller = open(temp.path());
        controller.set_preselected_class(Some(0)).expect("preselect");

        let size = ImageSize::new(100, 100);
        let display = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        let transform = FitTransform::fit(size, display).expect("fit");
        let drawn = Rect::from_min_size(pos2(10.0, 10.0), vec2(3.0, 3.0));

        let outcome = controller
            .submit_drawn_rect(drawn, &transform, 1.0)
            .expect("submit");
        assert_eq!(outcome, DrawOutcome::Discarded);
        assert!(!label_file(temp.path(), "a.png").exists());
    }

    #[test]
    fn preselection_commits_without_asking() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 200, 100);
        let mut controller = open(temp.path());
        controller.set_preselected_class(Some(1)).expect("preselect");

        let display = Rect::from_min_size(pos2(0.0, 0.0), vec2(400.0, 200.0));
        let transform = FitTransform::fit(ImageSize::new(200, 100), display).expect("fit");
        let drawn = Rect::from_min_max(pos2(0.0, 0.0), pos2(200.0, 100.0));

        let outcome = controller
            .submit_drawn_rect(drawn, &transform, 1.0)
            .expect("submit");
        let DrawOutcome::Committed(record) = outcome else {
            panic!("expected a committed record, got {outcome:?}");
        };
        assert_eq!(record.class_id, 1);
        assert_eq!(
            fs::read_to_string(label_file(temp.path(), "a.png")).expect("read"),
            "1 0.250000 0.250000 0.500000 0.500000\n"
        );
        let session = controller.session().expect("session");
        assert_eq!(session.boxes().len(), 1);
        assert_eq!(controller.label_for(session.boxes()[0].record.class_id), "fish");
    }

    #[test]
    fn unknown_preselection_is_rejected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        let mut controller = open(temp.path());
        assert!(matches!(
            controller.set_preselected_class(Some(7)),
            Err(AnnotatorError::Validation(ValidationError::UnknownClassId(7)))
        ));
        assert_eq!(controller.preselected_class(), None);
    }

    #[test]
    fn manual_pick_flow() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 100, 50);
        let mut controller = open(temp.path());

        let outcome = controller.submit_pixel_rect(rect(0, 0, 50, 50)).expect("submit");
        let DrawOutcome::NeedsClass(request) = outcome else {
            panic!("expected a class pick request, got {outcome:?}");
        };
        assert_eq!(request.options.len(), 2);
        assert_eq!(request.preview.x_center, 0.25);
        assert_eq!(request.preview.width, 0.5);

        let cancelled = controller
            .resolve_class_pick(request.clone(), ClassPickResult::Cancelled)
            .expect("cancel");
        assert!(cancelled.is_none());
        assert!(!label_file(temp.path(), "a.png").exists());

        let record = controller
            .resolve_class_pick(request, ClassPickResult::Chosen(0))
            .expect("choose")
            .expect("record");
        assert_eq!(record.class_id, 0);
        assert_eq!(controller.session().expect("session").boxes().len(), 1);
    }

    #[test]
    fn no_classes_blocks_drawing() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        fs::write(temp.path().join("classes.csv"), "zero;person\n").expect("write");

        let mut controller = SessionController::new(AnnotatorConfig::default());
        let report = controller.select_folder(temp.path()).expect("open");
        assert!(matches!(report.class_problem, Some(AnnotatorError::Parse { .. })));

        let err = controller.submit_pixel_rect(rect(0, 0, 5, 5)).unwrap_err();
        assert!(matches!(
            err,
            AnnotatorError::Validation(ValidationError::NoClasses)
        ));
        assert!(!label_file(temp.path(), "a.png").exists());
    }

    #[test]
    fn rename_keeps_records_resolving_by_id() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        let mut controller = open(temp.path());
        let dog = controller.add_class("dog").expect("add dog");
        assert_eq!(dog, 2);
        controller.commit_box(rect(1, 1, 5, 5), dog).expect("commit");

        controller.rename_class("dog", "wolf").expect("rename");
        controller.close();

        let controller = open(temp.path());
        let session = controller.session().expect("session");
        assert_eq!(session.boxes()[0].record.class_id, dog);
        assert_eq!(controller.label_for(dog), "wolf");
    }

    #[test]
    fn removed_class_leaves_dangling_records() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        let mut controller = open(temp.path());
        controller.set_preselected_class(Some(1)).expect("preselect");
        controller.commit_box(rect(1, 1, 5, 5), 1).expect("commit");

        controller.remove_class("fish").expect("remove");
        assert_eq!(controller.preselected_class(), None);
        assert_eq!(controller.label_for(1), "ID:1?");
        assert_eq!(controller.session().expect("session").boxes().len(), 1);
        // a new class gets a fresh id, not the removed one
        assert_eq!(controller.add_class("cat").expect("add"), 2);
    }

    #[test]
    fn failed_class_save_keeps_registry() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        let mut controller = open(temp.path());
        fs::remove_file(temp.path().join("classes.csv")).expect("remove");
        fs::create_dir(temp.path().join("classes.csv")).expect("block path");

        let err = controller.add_class("dog").unwrap_err();
        assert!(matches!(err, AnnotatorError::Io { .. }));
        let registry = controller.session().expect("session").registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.id_of("dog").is_none());
    }

    #[test]
    fn delete_selection_targets_one_record() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        let mut controller = open(temp.path());
        controller.commit_box(rect(1, 1, 5, 5), 0).expect("commit");
        controller.commit_box(rect(1, 1, 5, 5), 0).expect("commit");
        controller.commit_box(rect(2, 2, 6, 6), 1).expect("commit");

        let selected = controller.session().expect("session").boxes()[1].clone();
        controller.delete_current_selection(&selected).expect("delete");
        assert_eq!(controller.session().expect("session").boxes().len(), 2);

        let text = controller.session().expect("session").boxes()[0].text.clone();
        controller.commit_box(rect(1, 1, 5, 5), 0).expect("commit");
        assert_eq!(controller.delete_matching(&text).expect("delete"), 2);
        let boxes = controller.session().expect("session").boxes();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].record.class_id, 1);
    }

    #[test]
    fn renumber_rewrites_label_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        write_image(temp.path(), "b.png", 10, 10);
        let mut controller = open(temp.path());
        let dog = controller.add_class("dog").expect("add");
        controller.remove_class("person").expect("remove");
        controller.commit_box(rect(0, 0, 5, 5), dog).expect("commit");
        controller.next_image().expect("next");
        controller.commit_box(rect(0, 0, 5, 5), 1).expect("commit");
        controller.set_preselected_class(Some(dog)).expect("preselect");

        let mapping = controller.renumber_classes().expect("renumber");
        assert_eq!(mapping, HashMap::from([(1, 0), (2, 1)]));
        assert_eq!(controller.preselected_class(), Some(1));
        assert_eq!(
            fs::read_to_string(temp.path().join("classes.csv")).expect("read"),
            "0,fish\n1,dog\n"
        );
        let first = fs::read_to_string(label_file(temp.path(), "a.png")).expect("read");
        let second = fs::read_to_string(label_file(temp.path(), "b.png")).expect("read");
        assert!(first.starts_with("1 "));
        assert!(second.starts_with("0 "));
        assert_eq!(controller.label_for(1), "dog");
    }

    #[test]
    fn renumber_keeps_removed_class_ids_unassigned() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        let mut controller = open(temp.path());
        controller.commit_box(rect(0, 0, 5, 5), 0).expect("commit");
        let dog = controller.add_class("dog").expect("add dog");
        let cat = controller.add_class("cat").expect("add cat");
        controller.remove_class("person").expect("remove person");
        controller.remove_class("fish").expect("remove fish");

        let mapping = controller.renumber_classes().expect("renumber");
        assert_eq!(mapping, HashMap::from([(dog, 1), (cat, 2)]));
        assert_eq!(controller.label_for(0), "ID:0?");
        let session = controller.session().expect("session");
        assert_eq!(session.boxes()[0].record.class_id, 0);
        assert_eq!(
            fs::read_to_string(temp.path().join("classes.csv")).expect("read"),
            "1,dog\n2,cat\n"
        );
    }

    #[test]
    fn failed_renumber_leaves_files_untouched() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        let mut controller = open(temp.path());
        controller.commit_box(rect(0, 0, 5, 5), 1).expect("commit");
        controller.remove_class("person").expect("remove");
        let before = fs::read_to_string(label_file(temp.path(), "a.png")).expect("read");
        fs::remove_file(temp.path().join("classes.csv")).expect("remove");
        fs::create_dir(temp.path().join("classes.csv")).expect("block path");

        let err = controller.renumber_classes().unwrap_err();
        assert!(matches!(err, AnnotatorError::Io { .. }));
        assert_eq!(
            fs::read_to_string(label_file(temp.path(), "a.png")).expect("read"),
            before
        );
        assert_eq!(controller.label_for(1), "fish");
        assert_eq!(
            controller.session().expect("session").registry().id_of("fish"),
            Some(1)
        );
    }

    #[test]
    fn add_class_reports_exhausted_ids() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        fs::create_dir(temp.path().join("Yolov8")).expect("mkdir");
        fs::write(
            label_file(temp.path(), "a.png"),
            format!("{} 0.5 0.5 0.1 0.1\n", ClassId::MAX),
        )
        .expect("seed");
        let mut controller = open(temp.path());

        assert!(matches!(
            controller.add_class("dog"),
            Err(AnnotatorError::Validation(ValidationError::NoFreeClassId))
        ));
        assert_eq!(controller.session().expect("session").registry().len(), 2);
    }

    #[test]
    fn commit_rejects_unknown_class() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 10, 10);
        let mut controller = open(temp.path());

        assert!(matches!(
            controller.commit_box(rect(0, 0, 5, 5), 7),
            Err(AnnotatorError::Validation(ValidationError::UnknownClassId(7)))
        ));
        assert!(!label_file(temp.path(), "a.png").exists());
    }

    #[test]
    fn min_box_size_counts_physical_pixels() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_image(temp.path(), "a.png", 100, 100);
        let mut controller = open(temp.path());
        controller.set_preselected_class(Some(0)).expect("preselect");

        let display = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        let transform = FitTransform::fit(ImageSize::new(100, 100), display).expect("fit");
        // 3x3 points is 6x6 physical pixels at 2x
        let drawn = Rect::from_min_size(pos2(10.0, 10.0), vec2(3.0, 3.0));

        let low_dpi = controller
            .submit_drawn_rect(drawn, &transform, 1.0)
            .expect("submit");
        assert_eq!(low_dpi, DrawOutcome::Discarded);
        let high_dpi = controller
            .submit_drawn_rect(drawn, &transform, 2.0)
            .expect("submit");
        assert!(matches!(high_dpi, DrawOutcome::Committed(_)));
    }

    #[test]
    fn statistics_count_current_image_and_folder() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for name in ["a.png", "b.png", "c.png"] {
            write_image(temp.path(), name, 10, 10);
        }
        let mut controller = open(temp.path());
        controller.commit_box(rect(0, 0, 5, 5), 0).expect("commit");
        controller.commit_box(rect(0, 0, 6, 6), 1).expect("commit");
        controller.next_image().expect("next");
        controller.commit_box(rect(0, 0, 5, 5), 1).expect("commit");

        let stats = controller.statistics();
        assert_eq!(stats.total_images, 3);
        assert_eq!(stats.annotated_images, 2);
        assert_eq!(stats.current_class_counts.get(&1), Some(&1));
        assert_eq!(stats.current_class_counts.get(&0), None);
        assert_eq!(stats.total_class_counts.get(&0), Some(&1));
        assert_eq!(stats.total_class_counts.get(&1), Some(&2));
    }
}
