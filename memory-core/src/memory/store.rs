//! The authoritative, content-addressed store of memory records on disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::file_format;
use super::filter::MemoryFilter;
use super::record::{Memory, Scope, Status};
use crate::constants::paths;
use crate::error::{Error, Result};
use crate::id;

const MAX_MINT_ATTEMPTS: usize = 8;

/// Permitted field changes for [`MemoryStore::update`]. Any `None` field is
/// left unchanged.
#[derive(Debug, Clone, Default)]
pub struct MemoryChanges {
    /// New body text.
    pub content: Option<String>,
    /// Replacement tag set.
    pub tags: Option<BTreeSet<String>>,
    /// New importance.
    pub importance: Option<f64>,
    /// New scope.
    pub scope: Option<Scope>,
    /// New confidence.
    pub confidence: Option<f64>,
}

/// Filesystem-backed store of active and archived memory files.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: PathBuf,
}

impl MemoryStore {
    /// Opens (creating if absent) a store rooted at `root`, with an
    /// `archived/` subdirectory alongside the active files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directories cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tokio::fs::create_dir_all(root.join(paths::ARCHIVED_DIR)).await?;
        Ok(Self { root })
    }

    fn archived_dir(&self) -> PathBuf {
        self.root.join(paths::ARCHIVED_DIR)
    }

    fn active_path(&self, resolved_id: &str) -> Result<PathBuf> {
        id::resolve_under(&self.root, resolved_id, paths::MEMORY_FILE_EXTENSION)
    }

    fn archived_path(&self, resolved_id: &str) -> Result<PathBuf> {
        id::resolve_under(
            &self.archived_dir(),
            resolved_id,
            paths::MEMORY_FILE_EXTENSION,
        )
    }

    /// Mints an id, writes the file atomically, and returns the new
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if a filesystem-level id collision
    /// persists past [`MAX_MINT_ATTEMPTS`] retries, or [`Error::Io`] on
    /// any other I/O failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        content: String,
        project_id: String,
        tags: BTreeSet<String>,
        importance: f64,
        scope: Scope,
        source_session_id: Option<String>,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<Memory> {
        for _ in 0..MAX_MINT_ATTEMPTS {
            let candidate_id = id::mint(now);
            let path = self.active_path(&candidate_id)?;
            let memory = Memory::new(
                candidate_id.clone(),
                content.clone(),
                project_id.clone(),
                scope,
                importance,
                confidence,
                tags.clone(),
                source_session_id.clone(),
                now,
            );
            match self.write_new_file(&path, &memory).await {
                Ok(()) => return Ok(memory),
                Err(Error::Store(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(Error::Store(format!(
            "could not mint a unique id after {MAX_MINT_ATTEMPTS} attempts"
        )))
    }

    /// Writes `memory` to `path`, rejecting if the target already exists
    /// (a collision at the filesystem level).
    async fn write_new_file(&self, path: &Path, memory: &Memory) -> Result<()> {
        if tokio::fs::try_exists(path).await? {
            return Err(Error::Store(format!("{} already exists", path.display())));
        }
        self.write_atomic(path, &file_format::render(memory)).await
    }

    /// Writes `text` to `path` via write-to-temp then rename, so readers
    /// never observe a torn or partial file.
    async fn write_atomic(&self, path: &Path, text: &str) -> Result<()> {
        let temp_path = path.with_extension(format!(
            "{}{}",
            path.extension().and_then(|e| e.to_str()).unwrap_or(""),
            crate::constants::paths::TEMP_FILE_SUFFIX
        ));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&temp_path, text.as_bytes()).await?;
        match tokio::fs::rename(&temp_path, path).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(Error::Io(err))
            }
        }
    }

    /// Looks up a memory by id, searching the active directory then the
    /// archived directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if `id` fails path-safety checks,
    /// [`Error::NotFound`] if neither directory has a record, and
    /// [`Error::CorruptRecord`] if the file exists but its header cannot
    /// be parsed.
    pub async fn get(&self, raw_id: &str) -> Result<Memory> {
        let sanitized = id::sanitize(raw_id)?;
        let active_path = self.active_path(sanitized)?;
        if let Some(memory) = self.try_read(&active_path, sanitized).await? {
            return Ok(memory);
        }
        let archived_path = self.archived_path(sanitized)?;
        if let Some(memory) = self.try_read(&archived_path, sanitized).await? {
            return Ok(memory);
        }
        Err(Error::NotFound(sanitized.to_string()))
    }

    async fn try_read(&self, path: &Path, id_hint: &str) -> Result<Option<Memory>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(file_format::parse(id_hint, &text)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Reads, merges permitted fields, and atomically rewrites a memory.
    /// Always bumps `updated`; never changes `created`, `id`, or
    /// `source_session_id`.
    ///
    /// # Errors
    ///
    /// As [`Self::get`].
    pub async fn update(
        &self,
        raw_id: &str,
        changes: MemoryChanges,
        now: DateTime<Utc>,
    ) -> Result<Memory> {
        let sanitized = id::sanitize(raw_id)?.to_string();
        let mut memory = self.get(&sanitized).await?;

        if let Some(content) = changes.content {
            memory.content = content;
        }
        if let Some(tags) = changes.tags {
            memory.tags = tags;
        }
        if let Some(importance) = changes.importance {
            memory.importance = importance;
        }
        if let Some(scope) = changes.scope {
            memory.scope = scope;
        }
        if let Some(confidence) = changes.confidence {
            memory.confidence = confidence;
        }
        memory.updated = now;

        let path = match memory.status {
            Status::Active => self.active_path(&sanitized)?,
            Status::Archived => self.archived_path(&sanitized)?,
        };
        self.write_atomic(&path, &file_format::render(&memory))
            .await?;
        Ok(memory)
    }

    /// Enumerates memories matching `filter`. Corrupt records are skipped
    /// with a logged warning rather than aborting the enumeration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a directory cannot be read.
    pub async fn list(&self, filter: &MemoryFilter, include_archived: bool) -> Result<Vec<Memory>> {
        let mut results = self.list_dir(&self.root).await?;
        if include_archived {
            results.extend(self.list_dir(&self.archived_dir()).await?);
        }
        Ok(results.into_iter().filter(|m| filter.matches(m)).collect())
    }

    async fn list_dir(&self, dir: &Path) -> Result<Vec<Memory>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let file_name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => match file_format::parse(file_name, &text) {
                    Ok(memory) => out.push(memory),
                    Err(err) => {
                        tracing::warn!(id = file_name, error = %err, "skipping corrupt record during list");
                    }
                },
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(Error::Io(err)),
            }
        }
        Ok(out)
    }

    /// Moves the file from active to archived, sets `status=archived`,
    /// adds the `#archived` tag, and appends an entry to the day's
    /// archive manifest. Idempotent: returns `false` if already archived.
    ///
    /// # Errors
    ///
    /// As [`Self::get`].
    pub async fn archive(&self, raw_id: &str, reason: &str, now: DateTime<Utc>) -> Result<bool> {
        let sanitized = id::sanitize(raw_id)?.to_string();
        let mut memory = self.get(&sanitized).await?;
        if memory.status == Status::Archived {
            return Ok(false);
        }

        let importance_at_archive = memory.importance;
        memory.status = Status::Archived;
        memory.tags.insert(Memory::ARCHIVED_TAG.to_string());
        memory.updated = now;

        let active_path = self.active_path(&sanitized)?;
        let archived_path = self.archived_path(&sanitized)?;
        self.write_atomic(&archived_path, &file_format::render(&memory))
            .await?;
        self.append_archive_manifest(&sanitized, reason, importance_at_archive, now)
            .await?;
        match tokio::fs::remove_file(&active_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(Error::Io(err)),
        }
        Ok(true)
    }

    async fn append_archive_manifest(
        &self,
        id: &str,
        reason: &str,
        importance_at_archive: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let manifest_name = format!(
            "{}{}",
            now.format("%Y-%m-%d"),
            paths::ARCHIVE_MANIFEST_SUFFIX
        );
        let manifest_path = self.archived_dir().join(manifest_name);
        let line = format!(
            "{id} | {reason} | {} | {importance_at_archive:.6}\n",
            now.to_rfc3339()
        );
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&manifest_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}
