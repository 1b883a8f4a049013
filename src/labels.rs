use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{AnnotatorError, Result, ValidationError};
use crate::models::{BoxRecord, ClassId, StoredBox};

/// Per-image label files inside one label folder.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationStore {
    label_dir: PathBuf,
}

impl AnnotationStore {
    pub fn new(label_dir: impl Into<PathBuf>) -> Self {
        Self {
            label_dir: label_dir.into(),
        }
    }

    pub fn label_dir(&self) -> &Path {
        &self.label_dir
    }

    /// `<label dir>/<image stem>.txt`
    pub fn label_path(&self, image_name: &str) -> PathBuf {
        let stem = Path::new(image_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_name.to_string());
        self.label_dir.join(format!("{}.txt", stem))
    }

    /// Reads every well-formed record of an image, in file order.
    ///
    /// A missing file means no records. Malformed lines are logged and skipped.
    pub fn load_for_image(&self, image_name: &str) -> Result<Vec<StoredBox>> {
        let path = self.label_path(image_name);
        let Some(content) = read_optional(&path)? else {
            return Ok(Vec::new());
        };

        let mut boxes = Vec::new();
        for (line, raw) in content.lines().enumerate() {
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            match parse_box_line(text) {
                Ok(record) => boxes.push(StoredBox {
                    line,
                    text: text.to_string(),
                    record,
                }),
                Err(msg) => warn!("Skipping {:?} line {}: {}", path, line + 1, msg),
            }
        }
        debug!("Loaded {} boxes from {:?}", boxes.len(), path);
        Ok(boxes)
    }

    /// Appends one record line. Identical records may be appended repeatedly.
    pub fn append(&self, image_name: &str, record: &BoxRecord) -> Result<()> {
        let path = self.label_path(image_name);
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| AnnotatorError::io("open", &path, e))?;

        let mut line = String::new();
        if !ends_with_newline(&mut file).map_err(|e| AnnotatorError::io("read", &path, e))? {
            line.push('\n');
        }
        line.push_str(&record.to_string());
        line.push('\n');
        file.write_all(line.as_bytes())
            .map_err(|e| AnnotatorError::io("append to", &path, e))?;
        info!("Appended \"{}\" to {:?}", record, path);
        Ok(())
    }

    /// Removes every line whose trimmed text equals `line_text`.
    ///
    /// Textually identical records are all removed. Returns how many lines went.
    pub fn delete(&self, image_name: &str, line_text: &str) -> Result<usize> {
        let path = self.label_path(image_name);
        let Some(content) = read_optional(&path)? else {
            return Ok(0);
        };
        let target = line_text.trim();
        let kept: Vec<&str> = content.lines().filter(|l| l.trim() != target).collect();
        let removed = content.lines().count() - kept.len();
        if removed > 0 {
            write_lines(&path, &kept)?;
            info!("Deleted {} line(s) \"{}\" from {:?}", removed, target, path);
        }
        Ok(removed)
    }

    /// Removes exactly the line `stored` was read from.
    ///
    /// Fails with a stale-selection error when that line no longer holds the
    /// same text, leaving the file untouched.
    pub fn delete_record(&self, image_name: &str, stored: &StoredBox) -> Result<()> {
        let path = self.label_path(image_name);
        let content = read_optional(&path)?.unwrap_or_default();
        let mut lines: Vec<&str> = content.lines().collect();
        if lines.get(stored.line).map(|l| l.trim()) != Some(stored.text.as_str()) {
            warn!(
                "Line {} of {:?} no longer reads \"{}\"",
                stored.line + 1,
                path,
                stored.text
            );
            return Err(ValidationError::StaleSelection.into());
        }
        lines.remove(stored.line);
        write_lines(&path, &lines)?;
        info!("Deleted line {} \"{}\" from {:?}", stored.line + 1, stored.text, path);
        Ok(())
    }

    /// Class ids referenced by any well-formed line of any label file.
    pub fn used_class_ids(&self) -> Result<BTreeSet<ClassId>> {
        let mut ids = BTreeSet::new();
        for path in self.label_files()? {
            let content =
                fs::read_to_string(&path).map_err(|e| AnnotatorError::io("read", &path, e))?;
            ids.extend(
                content
                    .lines()
                    .filter_map(|line| parse_box_line(line).ok())
                    .map(|record| record.class_id),
            );
        }
        Ok(ids)
    }

    fn label_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.label_dir)
            .map_err(|e| AnnotatorError::io("list", &self.label_dir, e))?;
        Ok(entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "txt"))
            .collect())
    }

    /// Rewrites class ids in every label file of the folder.
    ///
    /// Only the leading id token of lines whose id is in `mapping` changes; the
    /// rest of each line is kept verbatim. Every file is read before any is
    /// written. If a write fails, the files already written are put back and
    /// the error is returned. On success the returned backup can undo the
    /// change.
    pub fn remap_classes(&self, mapping: &HashMap<ClassId, ClassId>) -> Result<RemapBackup> {
        let mut backup = RemapBackup::default();
        if mapping.is_empty() {
            return Ok(backup);
        }
        let mut pending = Vec::new();
        for path in self.label_files()? {
            let content =
                fs::read_to_string(&path).map_err(|e| AnnotatorError::io("read", &path, e))?;
            let mut changed = false;
            let lines: Vec<String> = content
                .lines()
                .map(|line| match remap_line(line, mapping) {
                    Some(new_line) => {
                        changed = true;
                        new_line
                    }
                    None => line.to_string(),
                })
                .collect();
            if changed {
                pending.push((path, content, lines));
            }
        }

        for (path, original, lines) in pending {
            backup.files.push((path.clone(), original));
            if let Err(e) = write_lines(&path, &lines) {
                if let Err(restore_err) = backup.restore() {
                    error!("{}", restore_err);
                }
                return Err(e);
            }
        }
        info!(
            "Remapped {} class id(s) in {} label file(s)",
            mapping.len(),
            backup.len()
        );
        Ok(backup)
    }
}

/// Original contents of the label files rewritten by a remap.
#[derive(Debug, Default)]
pub struct RemapBackup {
    files: Vec<(PathBuf, String)>,
}

impl RemapBackup {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Writes every file back. Keeps going past failures and returns the first.
    pub fn restore(&self) -> Result<()> {
        let mut first_err = None;
        for (path, original) in &self.files {
            if let Err(e) = fs::write(path, original) {
                let e = AnnotatorError::io("restore", path, e);
                error!("{}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => {
                debug!("Restored {} label file(s)", self.files.len());
                Ok(())
            }
        }
    }
}

/// Parses `class_id x_center y_center width height`.
pub fn parse_box_line(line: &str) -> std::result::Result<BoxRecord, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(format!("expected 5 fields, found {}", parts.len()));
    }
    let class_id: ClassId = parts[0]
        .parse()
        .map_err(|_| format!("invalid class id \"{}\"", parts[0]))?;
    let mut values = [0.0f64; 4];
    for (value, part) in values.iter_mut().zip(&parts[1..]) {
        *value = part
            .parse()
            .map_err(|_| format!("invalid coordinate \"{}\"", part))?;
    }
    Ok(BoxRecord {
        class_id,
        x_center: values[0],
        y_center: values[1],
        width: values[2],
        height: values[3],
    })
}

fn remap_line(line: &str, mapping: &HashMap<ClassId, ClassId>) -> Option<String> {
    let trimmed = line.trim_start();
    let (id, rest) = trimmed.split_once(char::is_whitespace)?;
    let new_id = mapping.get(&id.parse::<ClassId>().ok()?)?;
    Some(format!("{} {}", new_id, rest.trim_start()))
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AnnotatorError::io("read", path, e)),
    }
}

fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    fs::write(path, content).map_err(|e| AnnotatorError::io("write", path, e))
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
