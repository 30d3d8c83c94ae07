//! Whole-state saving and loading.
//!
//! A [`SavedGame`] is opaque: it carries the entire world, snapshots and
//! random generator included, so a loaded game continues exactly where the
//! saved one stopped.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use delve_core::DungeonError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::World;

/// Serializable copy of a whole world.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedGame {
    world: World,
}

/// Captures the world for later restoration.
#[must_use]
pub fn save(world: &World) -> SavedGame {
    SavedGame {
        world: world.clone(),
    }
}

/// Turns a saved game back into a playable world.
#[must_use]
pub fn load(saved: SavedGame) -> World {
    saved.world
}

/// Failures raised while reading or writing save files.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The save directory or file could not be accessed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The save file does not hold a world.
    #[error("save file {path} is malformed: {source}")]
    Format {
        /// Path of the malformed file.
        path: PathBuf,
        /// Underlying decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The request itself was invalid, such as an unknown save name.
    #[error(transparent)]
    Dungeon(#[from] DungeonError),
}

/// Directory of JSON save files named `<name>.json`.
#[derive(Clone, Debug)]
pub struct SaveStore {
    directory: PathBuf,
}

impl SaveStore {
    /// Creates a store rooted at `directory`; the directory is created lazily.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory holding the save files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes the world under `name`, replacing any earlier save.
    pub fn save(&self, name: &str, world: &World) -> Result<PathBuf, PersistenceError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.directory).map_err(|source| PersistenceError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let io_error = |source| PersistenceError::Io {
            path: path.clone(),
            source,
        };
        let file = File::create(&path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &save(world)).map_err(|source| {
            PersistenceError::Format {
                path: path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(io_error)?;

        info!(name, path = %path.display(), "game saved");
        Ok(path)
    }

    /// Reads the world saved under `name`.
    ///
    /// An unknown name is reported as [`DungeonError::InvalidArgument`].
    pub fn load(&self, name: &str) -> Result<World, PersistenceError> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(DungeonError::invalid_argument(format!("no save named '{name}'")).into());
        }

        let file = File::open(&path).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;
        let saved: SavedGame = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| PersistenceError::Format {
                path: path.clone(),
                source,
            })?;

        info!(name, path = %path.display(), "game loaded");
        Ok(load(saved))
    }

    /// Names of every save in the store, sorted.
    pub fn names(&self) -> Result<Vec<String>, PersistenceError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.directory.clone(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|extension| extension == "json"))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_owned))
            .collect();
        names.sort();
        Ok(names)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, DungeonError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || matches!(character, '-' | '_'));
        if !valid {
            return Err(DungeonError::invalid_argument(format!(
                "'{name}' is not a valid save name"
            )));
        }
        Ok(self.directory.join(format!("{name}.json")))
    }
}
