use std::collections::HashMap;
use std::fmt;

use crate::coords::NormalizedBox;

pub type ClassId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub id: ClassId,
    pub name: String,
}

/// One line of a label file: center-based box normalized to the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRecord {
    pub class_id: ClassId,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxRecord {
    pub fn new(class_id: ClassId, bbox: NormalizedBox) -> Self {
        Self {
            class_id,
            x_center: bbox.x_center,
            y_center: bbox.y_center,
            width: bbox.width,
            height: bbox.height,
        }
    }

    pub fn normalized(&self) -> NormalizedBox {
        NormalizedBox {
            x_center: self.x_center,
            y_center: self.y_center,
            width: self.width,
            height: self.height,
        }
    }
}

impl fmt::Display for BoxRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

/// A record as read back from disk, keyed by its position in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBox {
    /// 0-based line index in the label file, blank lines included.
    pub line: usize,
    /// Trimmed line text as found on disk.
    pub text: String,
    pub record: BoxRecord,
}

#[derive(Clone, Debug, Default)]
pub struct Statistics {
    pub total_images: usize,
    pub annotated_images: usize,
    pub total_class_counts: HashMap<ClassId, usize>, // whole folder
    pub current_class_counts: HashMap<ClassId, usize>, // active image
}
