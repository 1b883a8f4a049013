use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::error::{AnnotatorError, Result, ValidationError};
use crate::models::{ClassEntry, ClassId};

/// Mapping from class id to display name for one image folder.
///
/// Ids are stored with each entry and never derived from list position, so
/// label files keep pointing at the same class after edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassRegistry {
    entries: Vec<ClassEntry>,
}

impl ClassRegistry {
    /// Builds a registry numbering `names` from 0.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let entries = names
            .iter()
            .zip(0..)
            .map(|(name, id)| ClassEntry {
                id,
                name: name.as_ref().to_string(),
            })
            .collect();
        Self { entries }
    }

    /// Reads the class file at `path`, creating it from `defaults` when absent.
    ///
    /// Never fails outright: a malformed file yields an empty registry and a
    /// failed write of the defaults still yields the defaults. In both cases the
    /// problem is returned alongside so the caller can show it.
    pub fn load<S: AsRef<str>>(path: &Path, defaults: &[S]) -> (Self, Option<AnnotatorError>) {
        if !path.exists() {
            let registry = Self::from_names(defaults);
            info!(
                "No class file at {:?}, writing {} default classes",
                path,
                registry.len()
            );
            let problem = registry.save(path).err();
            return (registry, problem);
        }
        match Self::read(path) {
            Ok(registry) => {
                debug!("Loaded {} classes from {:?}", registry.len(), path);
                (registry, None)
            }
            Err(e) => {
                warn!("Could not load class file: {}", e);
                (Self::default(), Some(e))
            }
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| AnnotatorError::io("read", path, e))?;
        let mut registry = Self::default();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() {
                continue;
            }
            let entry =
                parse_class_line(line).map_err(|msg| AnnotatorError::parse(path, idx + 1, msg))?;
            if registry.name_of(entry.id).is_some() {
                return Err(AnnotatorError::parse(
                    path,
                    idx + 1,
                    format!("duplicate class id {}", entry.id),
                ));
            }
            if registry.id_of(&entry.name).is_some() {
                return Err(AnnotatorError::parse(
                    path,
                    idx + 1,
                    format!("duplicate class name \"{}\"", entry.name),
                ));
            }
            registry.entries.push(entry);
        }
        Ok(registry)
    }

    /// Writes one `id,name` record per line, in registry order.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(&format!("{},{}\n", entry.id, quote_name(&entry.name)));
        }
        fs::write(path, content).map_err(|e| {
            let err = AnnotatorError::io("write", path, e);
            error!("{}", err);
            err
        })
    }

    pub fn entries(&self) -> &[ClassEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_of(&self, id: ClassId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    pub fn id_of(&self, name: &str) -> Option<ClassId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// Name for display; ids missing from the registry get a placeholder.
    pub fn label_for(&self, id: ClassId) -> String {
        match self.name_of(id) {
            Some(name) => name.to_string(),
            None => format!("ID:{}?", id),
        }
    }

    /// Adds a class with the next id above every id in the registry.
    pub fn add(&mut self, name: &str) -> Result<ClassId> {
        self.add_above(name, 0)
    }

    /// Like [`add`](Self::add), but the new id is at least `floor`.
    pub fn add_above(&mut self, name: &str, floor: ClassId) -> Result<ClassId> {
        let name = validate_name(name)?;
        if self.id_of(name).is_some() {
            return Err(ValidationError::DuplicateClass(name.to_string()).into());
        }
        let next = match self.entries.iter().map(|e| e.id).max() {
            Some(max) => max.checked_add(1).ok_or(ValidationError::NoFreeClassId)?,
            None => 0,
        };
        let id = next.max(floor);
        self.entries.push(ClassEntry {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<ClassId> {
        let new_name = validate_name(new_name)?;
        let idx = self
            .entries
            .iter()
            .position(|e| e.name == old_name)
            .ok_or_else(|| ValidationError::UnknownClass(old_name.to_string()))?;
        if new_name != old_name && self.id_of(new_name).is_some() {
            return Err(ValidationError::DuplicateClass(new_name.to_string()).into());
        }
        self.entries[idx].name = new_name.to_string();
        Ok(self.entries[idx].id)
    }

    /// Removes a class. Records that use its id are left as they are.
    pub fn remove(&mut self, name: &str) -> Result<ClassEntry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| ValidationError::UnknownClass(name.to_string()))?;
        Ok(self.entries.remove(idx))
    }

    /// Compacts ids to `0..len` in ascending id order.
    ///
    /// Returns the ids that changed, old to new. Label files are not touched
    /// here; callers apply the mapping to them.
    pub fn renumber(&mut self) -> HashMap<ClassId, ClassId> {
        self.renumber_around(&BTreeSet::new())
    }

    /// Like [`renumber`](Self::renumber), but never assigns an id in `reserved`.
    ///
    /// Used with the ids still carried by records of removed classes, so those
    /// records keep resolving to no class.
    pub fn renumber_around(
        &mut self,
        reserved: &BTreeSet<ClassId>,
    ) -> HashMap<ClassId, ClassId> {
        self.entries.sort_by_key(|e| e.id);
        let free_ids = (0..=ClassId::MAX).filter(|id| !reserved.contains(id));
        let mut mapping = HashMap::new();
        for (entry, new_id) in self.entries.iter_mut().zip(free_ids) {
            if entry.id != new_id {
                mapping.insert(entry.id, new_id);
                entry.id = new_id;
            }
        }
        mapping
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyClassName.into());
    }
    Ok(name)
}

fn parse_class_line(line: &str) -> std::result::Result<ClassEntry, String> {
    let (id, name) = line
        .split_once(',')
        .ok_or_else(|| format!("expected \"id,name\", got \"{}\"", line))?;
    let id: ClassId = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid class id \"{}\"", id.trim()))?;
    let name = unquote_name(name.trim());
    if name.is_empty() {
        return Err(format!("empty name for class id {}", id));
    }
    Ok(ClassEntry { id, name })
}

fn quote_name(name: &str) -> String {
    if name.contains([',', '"']) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

fn unquote_name(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\"").trim().to_string(),
        None => raw.to_string(),
    }
}
