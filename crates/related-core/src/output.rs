//! Line-oriented output: `<source_id> => <id1>,<id2>,...`, one line per document.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::NeighborMapping;

/// Write every entry followed by `\n`. On failure, whatever was buffered is
/// flushed on a best-effort basis before the error is returned.
pub fn write_mapping<W: Write>(mapping: &NeighborMapping, out: W) -> Result<()> {
    let mut out = BufWriter::new(out);
    for entry in &mapping.entries {
        if let Err(e) = writeln!(out, "{}", entry) {
            if let Err(flush_err) = out.flush() {
                warn!(error = %flush_err, "flush after failed write also failed");
            }
            return Err(Error::OutputWrite(e));
        }
    }
    out.flush().map_err(Error::OutputWrite)
}

pub fn write_mapping_to_path(mapping: &NeighborMapping, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(Error::OutputWrite)?;
    write_mapping(mapping, file)?;
    info!(path = %path.display(), lines = mapping.len(), "wrote neighbor mapping");
    Ok(())
}

pub fn render_mapping(mapping: &NeighborMapping) -> String {
    let mut rendered = String::new();
    for entry in &mapping.entries {
        rendered.push_str(&entry.to_string());
        rendered.push('\n');
    }
    rendered
}
