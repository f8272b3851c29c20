//! Durable snapshots of the lookup table.
//!
//! A checkpoint is two files in the data directory, both named after the number of configurations
//! recorded when it was taken:
//!
//! - `<count>.table`: the table itself. A header of magic `CUBT`, a little endian `u32` format
//!   version, `u32` cube size and `u64` entry count, followed by one fixed width record per entry
//!   in key order: the key bytes, then the face, direction and slice of the action.
//! - `<count>.json`: a [`Manifest`] describing the run at that point.
//!
//! Both are written to a temporary file and renamed into place, so a crash mid-write never leaves
//! a truncated checkpoint behind.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    num::NonZeroU64,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use cube_core::{Action, CubeError, MAX_SIZE, StateKey};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{LookupTable, Stats, success};

const MAGIC: [u8; 4] = *b"CUBT";
const VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O failed for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Could not serialize manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{path} is not a valid table file: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Metadata written next to every table file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub size: usize,
    /// Whether inner slices were twisted as well as the outer layers
    #[serde(default)]
    pub deep_slices: bool,
    pub completed: u64,
    pub repeated: u64,
    pub depth: u32,
    pub entries: u64,
    /// Number of configurations first found at each depth, starting with the start configuration
    pub level_sizes: Vec<u64>,
    /// File name of the table, relative to the manifest
    pub table: String,
    /// Seconds since the unix epoch
    pub written_at: u64,
}

/// Decides when to snapshot the table and writes the snapshots
#[derive(Debug, Clone)]
pub struct Checkpointer {
    data_dir: PathBuf,
    increment: NonZeroU64,
    threshold: u64,
    deep_slices: bool,
}

fn next_threshold(completed: u64, increment: NonZeroU64) -> u64 {
    (completed / increment.get() + 1) * increment.get()
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CheckpointError {
    let path = path.to_owned();
    move |source| CheckpointError::Io { path, source }
}

fn corrupt(path: &Path, reason: impl Into<String>) -> CheckpointError {
    CheckpointError::Corrupt {
        path: path.to_owned(),
        reason: reason.into(),
    }
}

/// Write through a temporary file and rename it over `path` once it is durable. `write` is given
/// the path of the temporary file for its error reports.
fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>, &Path) -> Result<(), CheckpointError>,
) -> Result<(), CheckpointError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let file = File::create(&tmp).map_err(io_err(&tmp))?;
    let mut writer = BufWriter::new(file);

    let result = write(&mut writer, &tmp).and_then(|()| {
        let file = writer
            .into_inner()
            .map_err(|e| CheckpointError::Io {
                path: tmp.clone(),
                source: e.into_error(),
            })?;
        file.sync_all().map_err(io_err(&tmp))?;
        fs::rename(&tmp, path).map_err(io_err(path))
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }

    result
}

/// Write `table` to `path` in the table file format
///
/// # Errors
///
/// Fails if the file cannot be written
pub fn write_table(path: &Path, table: &LookupTable) -> Result<(), CheckpointError> {
    write_atomically(path, |writer, tmp| {
        let mut header = Vec::with_capacity(20);
        header.extend_from_slice(&MAGIC);
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&(table.size() as u32).to_le_bytes());
        header.extend_from_slice(&(table.len() as u64).to_le_bytes());
        writer.write_all(&header).map_err(io_err(tmp))?;

        for (key, action) in table.sorted_entries() {
            writer.write_all(key.as_bytes()).map_err(io_err(tmp))?;
            writer.write_all(&action.to_raw()).map_err(io_err(tmp))?;
        }

        Ok(())
    })
}

fn fill(reader: &mut impl Read, buf: &mut [u8], path: &Path) -> Result<(), CheckpointError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            corrupt(path, "file is truncated")
        } else {
            CheckpointError::Io {
                path: path.to_owned(),
                source: e,
            }
        }
    })
}

fn read_array<const N: usize>(
    reader: &mut impl Read,
    path: &Path,
) -> Result<[u8; N], CheckpointError> {
    let mut buf = [0; N];
    fill(reader, &mut buf, path)?;
    Ok(buf)
}

/// Read a table written by [`write_table`]
///
/// # Errors
///
/// Fails if the file cannot be read, or if the header, any record or the length is invalid
pub fn read_table(path: &Path) -> Result<LookupTable, CheckpointError> {
    let file = File::open(path).map_err(io_err(path))?;
    let mut reader = BufReader::new(file);

    if read_array::<4>(&mut reader, path)? != MAGIC {
        return Err(corrupt(path, "bad magic"));
    }

    let version = u32::from_le_bytes(read_array(&mut reader, path)?);
    if version != VERSION {
        return Err(corrupt(path, format!("unsupported version {version}")));
    }

    let n = u32::from_le_bytes(read_array(&mut reader, path)?) as usize;
    let count = u64::from_le_bytes(read_array(&mut reader, path)?);

    if !(2..=MAX_SIZE).contains(&n) {
        return Err(corrupt(path, format!("invalid cube size {n}")));
    }

    let key_len = StateKey::len_for(n);
    let mut table = LookupTable::new(n);

    for _ in 0..count {
        let mut key = vec![0; key_len];
        fill(&mut reader, &mut key, path)?;
        let [face, direction, slice] = read_array::<3>(&mut reader, path)?;

        let bad_record = |e: CubeError| corrupt(path, e.to_string());
        let key = StateKey::from_bytes(n, key).map_err(bad_record)?;
        let action = Action::from_raw(face, direction, slice, n).map_err(bad_record)?;

        if !table.insert_first(key, action) {
            return Err(corrupt(path, "duplicate key"));
        }
    }

    let mut rest = [0; 1];
    match reader.read(&mut rest) {
        Ok(0) => Ok(table),
        Ok(_) => Err(corrupt(path, "trailing bytes after the last record")),
        Err(e) => Err(CheckpointError::Io {
            path: path.to_owned(),
            source: e,
        }),
    }
}

/// # Errors
///
/// Fails if the file cannot be read or is not a manifest
pub fn read_manifest(path: &Path) -> Result<Manifest, CheckpointError> {
    let file = File::open(path).map_err(io_err(path))?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| CheckpointError::Manifest {
        path: path.to_owned(),
        source,
    })
}

/// Find the checkpoint in `data_dir` with the most recorded configurations.
///
/// Returns the path of its table file together with its manifest. Files that are not manifests are
/// skipped with a warning.
///
/// # Errors
///
/// Fails if the directory cannot be listed
pub fn latest_checkpoint(data_dir: &Path) -> Result<Option<(PathBuf, Manifest)>, CheckpointError> {
    newest_matching(data_dir, |_| true)
}

/// Like [`latest_checkpoint`], but only considers checkpoints of cubes of size `size`
///
/// # Errors
///
/// Fails if the directory cannot be listed
pub fn latest_checkpoint_for(
    data_dir: &Path,
    size: usize,
) -> Result<Option<(PathBuf, Manifest)>, CheckpointError> {
    newest_matching(data_dir, |manifest| manifest.size == size)
}

fn newest_matching(
    data_dir: &Path,
    keep: impl Fn(&Manifest) -> bool,
) -> Result<Option<(PathBuf, Manifest)>, CheckpointError> {
    let mut best: Option<(PathBuf, Manifest)> = None;

    for entry in fs::read_dir(data_dir).map_err(io_err(data_dir))? {
        let path = entry.map_err(io_err(data_dir))?.path();

        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }

        let manifest = match read_manifest(&path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };

        if !keep(&manifest) {
            continue;
        }

        if best
            .as_ref()
            .is_none_or(|(_, current)| manifest.completed > current.completed)
        {
            best = Some((data_dir.join(&manifest.table), manifest));
        }
    }

    Ok(best)
}

impl Checkpointer {
    /// A checkpointer whose first snapshot is due at the first multiple of `increment` above
    /// `completed`. `deep_slices` is recorded in every manifest so that a resumed run can check it
    /// twists the same layers.
    #[must_use]
    pub fn new(
        data_dir: PathBuf,
        increment: NonZeroU64,
        completed: u64,
        deep_slices: bool,
    ) -> Checkpointer {
        Checkpointer {
            data_dir,
            increment,
            threshold: next_threshold(completed, increment),
            deep_slices,
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The completed count at which the next snapshot is due
    #[must_use]
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    #[must_use]
    pub fn is_due(&self, completed: u64) -> bool {
        completed >= self.threshold
    }

    /// Snapshot the table if the completed count has passed the threshold.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot could not be written. The threshold is left alone so the next poll
    /// tries again.
    pub fn poll(
        &mut self,
        table: &LookupTable,
        stats: &Stats,
    ) -> Result<Option<PathBuf>, CheckpointError> {
        if self.is_due(stats.completed) {
            self.write(table, stats).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Snapshot the table now and move the threshold past the current count
    ///
    /// # Errors
    ///
    /// Fails if either file could not be written
    pub fn write(&mut self, table: &LookupTable, stats: &Stats) -> Result<PathBuf, CheckpointError> {
        fs::create_dir_all(&self.data_dir).map_err(io_err(&self.data_dir))?;

        let table_name = format!("{}.table", stats.completed);
        let table_path = self.data_dir.join(&table_name);
        let manifest_path = self.data_dir.join(format!("{}.json", stats.completed));

        write_table(&table_path, table).inspect_err(|e| warn!("{e}"))?;

        let manifest = Manifest {
            size: table.size(),
            deep_slices: self.deep_slices,
            completed: stats.completed,
            repeated: stats.repeated,
            depth: stats.depth,
            entries: table.len() as u64,
            level_sizes: stats.level_sizes.clone(),
            table: table_name,
            written_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
        };

        write_atomically(&manifest_path, |writer, tmp| {
            serde_json::to_writer_pretty(&mut *writer, &manifest).map_err(|source| {
                CheckpointError::Manifest {
                    path: tmp.to_owned(),
                    source,
                }
            })?;
            writer.write_all(b"\n").map_err(io_err(tmp))
        })
        .inspect_err(|e| warn!("{e}"))?;

        self.threshold = next_threshold(stats.completed, self.increment);

        info!(
            success!("Wrote {} ({} entries), next checkpoint at {}"),
            table_path.display(),
            table.len(),
            self.threshold
        );

        Ok(table_path)
    }
}
