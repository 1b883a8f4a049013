use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::ClassId;

#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to serialize config: {0}")]
    Config(#[from] toml::ser::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Rejections shown to the user as a warning; the action is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("folder {} contains no images", .0.display())]
    NoImages(PathBuf),
    #[error("no classes defined, add one in the class manager first")]
    NoClasses,
    #[error("class \"{0}\" already exists")]
    DuplicateClass(String),
    #[error("class name must not be empty")]
    EmptyClassName,
    #[error("class \"{0}\" does not exist")]
    UnknownClass(String),
    #[error("class id {0} does not exist")]
    UnknownClassId(ClassId),
    #[error("no image folder is open")]
    NoSession,
    #[error("no class id left to assign")]
    NoFreeClassId,
    #[error("the selected record changed on disk, reload and try again")]
    StaleSelection,
}

impl AnnotatorError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        AnnotatorError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        AnnotatorError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnotatorError>;
