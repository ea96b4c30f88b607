//! Reading JSON inputs and assembling contexts from snapshot files.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use dvg_store::{load_context, ForkRef, InMemorySnapshotStore};
use dvg_types::{Document, FindDivergencesContext, Resolution};
use serde_json::Value;

use crate::cli::SnapshotArgs;

/// Read JSON from a file, or from stdin when `source` is `-`.
pub fn read_json(source: &str) -> anyhow::Result<Value> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        return serde_json::from_str(&text).context("parsing JSON from stdin");
    }
    read_json_file(Path::new(source))
}

pub fn read_json_file(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing JSON in {}", path.display()))
}

fn read_document(path: &Path) -> anyhow::Result<Document> {
    let value = read_json_file(path)?;
    Document::from_value(value).with_context(|| format!("{} is not a document", path.display()))
}

pub fn read_resolutions(path: &Path) -> anyhow::Result<Vec<Resolution>> {
    let value = read_json_file(path)?;
    serde_json::from_value(value)
        .with_context(|| format!("{} is not a list of resolutions", path.display()))
}

/// Load the three snapshot files and assemble a context through a snapshot
/// store, the same way a host application would.
pub async fn load_snapshots(args: &SnapshotArgs) -> anyhow::Result<FindDivergencesContext> {
    let fork = read_document(&args.fork)?;
    let upstream = read_document(&args.upstream)?;
    let subject = read_document(&args.subject)?;

    if fork.id() != upstream.id() {
        bail!(
            "fork snapshot ({}) and upstream snapshot ({}) are different documents",
            fork.id(),
            upstream.id()
        );
    }
    if subject.id() == upstream.id() {
        bail!("subject and upstream snapshots are the same document ({})", subject.id());
    }
    let fork_revision = fork
        .rev()
        .with_context(|| format!("{} has no _rev", args.fork.display()))?;
    let fork_ref = ForkRef::new(upstream.id(), fork_revision, subject.id());

    let store = InMemorySnapshotStore::new();
    for (doc, path) in [(fork, &args.fork), (upstream, &args.upstream), (subject, &args.subject)] {
        store
            .put(doc)
            .with_context(|| format!("loading {}", path.display()))?;
    }

    let resolutions = match &args.resolutions {
        Some(path) => read_resolutions(path)?,
        None => Vec::new(),
    };
    Ok(load_context(&store, &fork_ref, resolutions).await?)
}
