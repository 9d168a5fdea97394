//! Subcommand definitions and their dispatch against a [`CliMemorySystem`].

use std::io::Write;

use clap::Subcommand;
use colored::Colorize;
use memory_core::memory::MemoryFilter;
use serde::Serialize;

use crate::output::{OutputFormat, Render};
use crate::system::CliMemorySystem;

/// Every operation this CLI exposes on top of [`memory_core::system::MemorySystem`].
#[derive(Subcommand)]
pub enum Command {
    /// Saves a new memory.
    Save {
        /// The memory's text content.
        content: String,
        /// Comma-separated tags.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Importance in `[0, 1]`.
        #[arg(long)]
        importance: Option<f64>,
        /// Project id; omit for a global memory.
        #[arg(long)]
        project: Option<String>,
        /// Session id this memory was saved under.
        #[arg(long)]
        session: Option<String>,
        /// Reject the save if it duplicates an existing memory.
        #[arg(long)]
        check_contradictions: bool,
    },
    /// Fetches a memory by id.
    Get {
        /// The memory id.
        id: String,
    },
    /// Lists memories, optionally filtered.
    List {
        /// Restrict to this project id.
        #[arg(long)]
        project: Option<String>,
        /// Restrict to memories carrying this tag.
        #[arg(long)]
        tag: Option<String>,
        /// Restrict to importance at or above this value.
        #[arg(long)]
        min_importance: Option<f64>,
        /// Include archived memories.
        #[arg(long)]
        include_archived: bool,
    },
    /// Runs a hybrid keyword/semantic search.
    Search {
        /// The search query.
        query: String,
        /// Maximum number of results.
        #[arg(long)]
        top_k: Option<usize>,
        /// Restrict to this project id (plus every global memory).
        #[arg(long)]
        project: Option<String>,
    },
    /// Archives a memory.
    Archive {
        /// The memory id.
        id: String,
        /// Why it's being archived.
        reason: String,
    },
    /// Prints aggregate store statistics.
    Stats,
    /// Runs one maintenance pass (generational GC, cache sweeps).
    Maintenance {
        /// Classify candidates without archiving or mutating state.
        #[arg(long)]
        dry_run: bool,
    },
}

impl Command {
    /// Executes this command against `system`, printing its result under `format`.
    pub async fn run(self, system: &CliMemorySystem, format: OutputFormat) -> anyhow::Result<()> {
        match self {
            Command::Save { content, tags, importance, project, session, check_contradictions } => {
                let tags = if tags.is_empty() { None } else { Some(tags.into_iter().collect()) };
                let memory = system
                    .save(content, tags, importance, project, session.clone(), session, check_contradictions)
                    .await?;
                format.print(&MemoryView::from(memory))
            }
            Command::Get { id } => {
                let memory = system.get(&id).await?;
                format.print(&MemoryView::from(memory))
            }
            Command::List { project, tag, min_importance, include_archived } => {
                let mut filter = MemoryFilter::all();
                if let Some(project) = project {
                    filter = filter.with_project(project);
                }
                if let Some(tag) = tag {
                    filter = filter.with_tag(tag);
                }
                if let Some(min_importance) = min_importance {
                    filter = filter.with_min_importance(min_importance);
                }
                let memories = system.list(&filter, include_archived).await?;
                let views: Vec<MemoryView> = memories.into_iter().map(MemoryView::from).collect();
                format.print(&MemoryListView(views))
            }
            Command::Search { query, top_k, project } => {
                let results = system.search(&query, top_k, project.as_deref()).await?;
                let views: Vec<SearchResultView> = results
                    .into_iter()
                    .map(|r| SearchResultView {
                        memory: MemoryView::from(r.memory),
                        score: r.score,
                        explanation: r.explanation,
                    })
                    .collect();
                format.print(&SearchResultListView(views))
            }
            Command::Archive { id, reason } => {
                let archived = system.archive(&id, &reason).await?;
                format.print(&ArchiveView { id, archived })
            }
            Command::Stats => {
                let stats = system.get_stats().await?;
                format.print(&StatsView::from(stats))
            }
            Command::Maintenance { dry_run } => {
                let report = system.run_maintenance(dry_run).await?;
                format.print(&MaintenanceView::from(report))
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct MemoryView {
    id: String,
    content: String,
    project_id: String,
    scope: String,
    status: String,
    importance: f64,
    confidence: f64,
    tags: Vec<String>,
}

impl From<memory_core::memory::Memory> for MemoryView {
    fn from(memory: memory_core::memory::Memory) -> Self {
        Self {
            id: memory.id,
            content: memory.content,
            project_id: memory.project_id,
            scope: memory.scope.to_string(),
            status: memory.status.to_string(),
            importance: memory.importance,
            confidence: memory.confidence,
            tags: memory.tags.into_iter().collect(),
        }
    }
}

impl Render for MemoryView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "{} {}", self.id.bold(), format!("[{}/{}]", self.scope, self.status).dimmed())?;
        writeln!(writer, "{}", self.content)?;
        writeln!(
            writer,
            "project={} importance={:.2} confidence={:.2} tags={}",
            self.project_id,
            self.importance,
            self.confidence,
            self.tags.join(",")
        )?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MemoryListView(Vec<MemoryView>);

impl Render for MemoryListView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for view in &self.0 {
            view.write_human(&mut writer)?;
            writeln!(writer)?;
        }
        writeln!(writer, "{}", format!("{} memories", self.0.len()).dimmed())?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SearchResultView {
    memory: MemoryView,
    score: f64,
    explanation: String,
}

#[derive(Debug, Serialize)]
struct SearchResultListView(Vec<SearchResultView>);

impl Render for SearchResultListView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for result in &self.0 {
            writeln!(writer, "{:.3} {}", result.score, result.memory.id.bold())?;
            writeln!(writer, "{}", result.memory.content)?;
            writeln!(writer, "{}", result.explanation.dimmed())?;
            writeln!(writer)?;
        }
        writeln!(writer, "{}", format!("{} results", self.0.len()).dimmed())?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ArchiveView {
    id: String,
    archived: bool,
}

impl Render for ArchiveView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.archived {
            writeln!(writer, "{} {}", "archived".green(), self.id)
        } else {
            writeln!(writer, "{} {} (still referenced)", "vetoed".yellow(), self.id)
        }
        .map_err(Into::into)
    }
}

#[derive(Debug, Serialize)]
struct StatsView {
    total: usize,
    avg_importance: f64,
    confidence_distribution: std::collections::BTreeMap<String, u64>,
    tag_counts: std::collections::BTreeMap<String, u64>,
    project_counts: std::collections::BTreeMap<String, u64>,
    entity_counts: std::collections::BTreeMap<String, u64>,
}

impl From<memory_core::system::MemoryStats> for StatsView {
    fn from(stats: memory_core::system::MemoryStats) -> Self {
        Self {
            total: stats.total,
            avg_importance: stats.avg_importance,
            confidence_distribution: stats.confidence_distribution,
            tag_counts: stats.tag_counts,
            project_counts: stats.project_counts,
            entity_counts: stats.entity_counts,
        }
    }
}

impl Render for StatsView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "{} memories, avg importance {:.2}", self.total, self.avg_importance)?;
        writeln!(writer, "confidence: {:?}", self.confidence_distribution)?;
        writeln!(writer, "tags: {:?}", self.tag_counts)?;
        writeln!(writer, "projects: {:?}", self.project_counts)?;
        writeln!(writer, "entities: {:?}", self.entity_counts)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MaintenanceView {
    dry_run_note: String,
    duration_ms: u64,
    decay_count: usize,
    archived_count: usize,
    reviews_overdue: usize,
    search_cache_entries_swept: usize,
    embedding_cache_entries_pruned: usize,
}

impl From<memory_core::system::MaintenanceReport> for MaintenanceView {
    fn from(report: memory_core::system::MaintenanceReport) -> Self {
        Self {
            dry_run_note: format!("ran at {}", report.timestamp),
            duration_ms: report.duration_ms,
            decay_count: report.decay_count,
            archived_count: report.archived_count,
            reviews_overdue: report.health.reviews_overdue,
            search_cache_entries_swept: report.health.search_cache_entries_swept,
            embedding_cache_entries_pruned: report.health.embedding_cache_entries_pruned,
        }
    }
}

impl Render for MaintenanceView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "{}", self.dry_run_note)?;
        writeln!(writer, "{}ms, archived {}, reviews overdue {}", self.duration_ms, self.archived_count, self.reviews_overdue)?;
        writeln!(
            writer,
            "search cache swept {}, embeddings pruned {}",
            self.search_cache_entries_swept, self.embedding_cache_entries_pruned
        )?;
        Ok(())
    }
}
