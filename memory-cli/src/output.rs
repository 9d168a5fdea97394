//! Output formatting: human-readable or JSON, selected by `--format`.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

/// Selects how command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored summary.
    Human,
    /// Pretty-printed JSON, for scripting.
    Json,
}

/// Implemented by every command result so it can render under either
/// [`OutputFormat`].
pub trait Render: Serialize {
    /// Writes the human-readable rendering to `writer`.
    fn write_human<W: Write>(&self, writer: W) -> anyhow::Result<()>;
}

impl OutputFormat {
    /// Renders `data` to stdout under this format.
    pub fn print<T: Render>(&self, data: &T) -> anyhow::Result<()> {
        match self {
            OutputFormat::Human => data.write_human(io::stdout()),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(io::stdout(), data)?;
                println!();
                Ok(())
            }
        }
    }
}
