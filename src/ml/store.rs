//! Versioned on-disk model store
//!
//! Layout under the store root:
//!
//! ```text
//! CURRENT                         name of the current generation
//! generations/<id>/model.bin      bincode-encoded forest
//! generations/<id>/metadata.json  ModelMetadata
//! ```
//!
//! A generation directory is fully written before `CURRENT` is swapped to it
//! with a write-to-temp-then-rename, so a reader that resolves `CURRENT` once
//! always sees a model and metadata from the same generation.
//!
//! Saves are serialized: clones of a store share an in-process mutex, and a
//! `LOCK` file under the root excludes saves from other processes.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use chrono::Utc;
use parking_lot::Mutex;
use tempfile::NamedTempFile;

use super::{ModelMetadata, ModelType, SmartcoreRandomForest, TrainedModel};
use crate::error::{ForecastError, Result};

const CURRENT_FILE: &str = "CURRENT";
const GENERATIONS_DIR: &str = "generations";
const MODEL_FILE: &str = "model.bin";
const METADATA_FILE: &str = "metadata.json";
const LOCK_FILE: &str = "LOCK";

const LOCK_TIMEOUT: Duration = Duration::from_secs(30);
const LOCK_POLL: Duration = Duration::from_millis(20);
/// A lock file older than this is left over from a crashed save.
const STALE_LOCK: Duration = Duration::from_secs(600);

/// A model resolved from the store together with its metadata.
#[derive(Debug)]
pub struct LoadedModel {
    pub model: SmartcoreRandomForest,
    pub metadata: ModelMetadata,
}

impl LoadedModel {
    pub fn feature_names(&self) -> &[String] {
        &self.metadata.features
    }
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
    retain_generations: usize,
    save_lock: Arc<Mutex<()>>,
}

impl ModelStore {
    /// `retain_generations` is clamped to at least one.
    pub fn new(root: impl Into<PathBuf>, retain_generations: usize) -> Self {
        Self {
            root: root.into(),
            retain_generations: retain_generations.max(1),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `trained` as a new generation and make it current.
    ///
    /// Older generations beyond the retention count are pruned afterwards; a
    /// pruning failure is logged and does not fail the save.
    pub fn save(&self, trained: &TrainedModel) -> Result<ModelMetadata> {
        let generations = self.root.join(GENERATIONS_DIR);
        fs::create_dir_all(&generations)?;

        let _guard = self.save_lock.lock();
        let _lock = LockFile::acquire(&self.root.join(LOCK_FILE))?;

        let (generation, dir) = create_generation_dir(&generations)?;
        let metadata = ModelMetadata {
            generation: generation.clone(),
            model_type: ModelType::RandomForest,
            trained_at: Utc::now(),
            training_samples: trained.training_samples,
            features: trained.feature_names.clone(),
            target: trained.target.clone(),
            feature_selection: trained.feature_selection,
            params: trained.model.params(),
            metrics: trained.metrics,
        };

        let metadata_json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| ForecastError::Serialization(e.to_string()))?;
        write_atomic(&dir.join(MODEL_FILE), &trained.model.to_bytes()?)?;
        write_atomic(&dir.join(METADATA_FILE), &metadata_json)?;

        write_atomic(&self.root.join(CURRENT_FILE), generation.as_bytes())?;
        tracing::info!(
            root = %self.root.display(),
            generation = %generation,
            features = metadata.features.len(),
            "saved model generation"
        );

        self.prune();
        Ok(metadata)
    }

    /// Load the current model and its feature names.
    ///
    /// # Errors
    ///
    /// - `ModelNotFound` if nothing has been saved under the root
    /// - `CorruptStore` if `CURRENT` names a missing or unreadable generation
    pub fn load(&self) -> Result<LoadedModel> {
        let mut generation = self.require_current()?;
        let mut attempts = 0;
        loop {
            match self.load_generation(&generation) {
                Ok(loaded) => {
                    tracing::info!(
                        generation = %generation,
                        features = loaded.metadata.features.len(),
                        "loaded model"
                    );
                    return Ok(loaded);
                }
                Err(e) => {
                    // A save may have swapped and pruned the generation while it was being read.
                    attempts += 1;
                    match self.current_generation()? {
                        Some(current) if current != generation && attempts < 3 => {
                            generation = current;
                        }
                        _ => return Err(e),
                    }
                }
            }
        }
    }

    fn load_generation(&self, generation: &str) -> Result<LoadedModel> {
        let dir = self.generation_dir(generation);
        let metadata = self.read_metadata(&dir)?;
        let bytes = fs::read(dir.join(MODEL_FILE))
            .map_err(|e| self.corrupt(format!("generation {generation}: {MODEL_FILE}: {e}")))?;
        let model = SmartcoreRandomForest::from_bytes(&bytes)?;
        Ok(LoadedModel { model, metadata })
    }

    /// Metadata of the current generation, without decoding the model.
    pub fn metadata(&self) -> Result<ModelMetadata> {
        let generation = self.require_current()?;
        self.read_metadata(&self.generation_dir(&generation))
    }

    /// Name of the current generation, `None` before the first save.
    pub fn current_generation(&self) -> Result<Option<String>> {
        let raw = match fs::read_to_string(self.root.join(CURRENT_FILE)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let generation = raw.trim();
        if generation.is_empty()
            || generation.contains(['/', '\\'])
            || generation.starts_with('.')
        {
            return Err(self.corrupt(format!("invalid {CURRENT_FILE} pointer {raw:?}")));
        }
        Ok(Some(generation.to_string()))
    }

    /// Generation names, oldest first.
    pub fn generations(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(self.root.join(GENERATIONS_DIR)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn require_current(&self) -> Result<String> {
        self.current_generation()?
            .ok_or_else(|| ForecastError::ModelNotFound {
                root: self.root.clone(),
            })
    }

    fn generation_dir(&self, generation: &str) -> PathBuf {
        self.root.join(GENERATIONS_DIR).join(generation)
    }

    fn read_metadata(&self, dir: &Path) -> Result<ModelMetadata> {
        let raw = fs::read(dir.join(METADATA_FILE))
            .map_err(|e| self.corrupt(format!("{}: {e}", dir.join(METADATA_FILE).display())))?;
        let metadata: ModelMetadata = serde_json::from_slice(&raw)
            .map_err(|e| self.corrupt(format!("{METADATA_FILE}: {e}")))?;
        if metadata.features.is_empty() {
            return Err(self.corrupt("metadata lists no features".to_string()));
        }
        Ok(metadata)
    }

    fn corrupt(&self, reason: String) -> ForecastError {
        ForecastError::CorruptStore {
            root: self.root.clone(),
            reason,
        }
    }

    /// Remove the oldest generations until at most `retain_generations` are
    /// left. Only complete generations older than the one `CURRENT` names are
    /// candidates. Called with the save lock held.
    fn prune(&self) {
        let generations = match self.generations() {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = %e, "could not list model generations for pruning");
                return;
            }
        };
        let current = match self.current_generation() {
            Ok(Some(current)) => current,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "skipping pruning, unreadable pointer");
                return;
            }
        };

        let old: Vec<&String> = generations
            .iter()
            .filter(|g| g.as_str() < current.as_str())
            .filter(|g| self.generation_dir(g).join(METADATA_FILE).is_file())
            .collect();
        let excess = generations.len().saturating_sub(self.retain_generations);
        for generation in old.into_iter().take(excess) {
            match fs::remove_dir_all(self.generation_dir(generation)) {
                Ok(()) => tracing::debug!(generation = %generation, "pruned model generation"),
                Err(e) => tracing::warn!(
                    generation = %generation,
                    error = %e,
                    "failed to prune model generation"
                ),
            }
        }
    }
}

/// Exclusive `LOCK` file, removed on drop.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(path: &Path) -> Result<Self> {
        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    write!(file, "{}", std::process::id())?;
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(path) {
                        tracing::warn!(path = %path.display(), "removing stale store lock");
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("timed out waiting for {}", path.display()),
                        )
                        .into());
                    }
                    std::thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK)
}

/// Create `generations/<id>` with an id that sorts by creation time.
fn create_generation_dir(generations: &Path) -> Result<(String, PathBuf)> {
    loop {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.6fZ"),
            &suffix[..8]
        );
        let dir = generations.join(&id);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok((id, dir)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
