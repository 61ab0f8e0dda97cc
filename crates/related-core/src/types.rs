//! Domain types shared by the loader, the ranking pipeline and the writer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::error::{Error, Result};

/// Opaque document identifier, preserved verbatim from the input record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

/// A single input record.
///
/// - `id`: identity of the document; unique within a well-formed corpus
/// - `text`: the title used for similarity
/// - `categories`: normalized set of labels; two documents are comparable
///   only when these sets intersect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub text: String,
    pub categories: BTreeSet<String>,
}

impl Document {
    pub fn new<I, S>(id: impl Into<String>, text: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: DocId::new(id),
            text: text.into(),
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn shares_category_with(&self, other: &Document) -> bool {
        !self.categories.is_disjoint(&other.categories)
    }
}

/// Documents in input order. Positions are stable for the lifetime of a run
/// and are used as handles everywhere downstream of the loader.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    docs: Vec<Document>,
}

impl Corpus {
    /// Build a corpus, rejecting duplicate identifiers.
    pub fn new(docs: Vec<Document>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(docs.len());
        for (pos, doc) in docs.iter().enumerate() {
            if !seen.insert(&doc.id) {
                return Err(Error::InputFormat(format!(
                    "record {}: duplicate id '{}'",
                    pos, doc.id
                )));
            }
        }
        Ok(Self { docs })
    }

    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, Document> { self.docs.iter() }
}

impl std::ops::Index<usize> for Corpus {
    type Output = Document;
    fn index(&self, pos: usize) -> &Document { &self.docs[pos] }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;
    fn into_iter(self) -> Self::IntoIter { self.docs.iter() }
}

/// Score of one candidate against a query. `position` is the candidate's
/// index in the corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub position: usize,
    pub candidate_id: DocId,
    pub score: f32,
}

/// Why a document's neighbor list is shorter than it could have been.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// The query text could not be embedded; the list is empty.
    QueryEmbedFailed(String),
    /// The query embedding has zero norm; the list is empty.
    QueryDegenerate,
    /// One candidate was dropped from the ranking.
    CandidateSkipped { candidate_id: DocId, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWarning {
    pub source_id: DocId,
    pub kind: WarningKind,
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::QueryEmbedFailed(reason) => {
                write!(f, "{}: query embedding failed ({})", self.source_id, reason)
            }
            WarningKind::QueryDegenerate => {
                write!(f, "{}: query embedding is degenerate", self.source_id)
            }
            WarningKind::CandidateSkipped { candidate_id, reason } => {
                write!(f, "{}: skipped candidate {} ({})", self.source_id, candidate_id, reason)
            }
        }
    }
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    pub source_id: DocId,
    pub neighbor_ids: Vec<DocId>,
}

impl fmt::Display for NeighborEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => ", self.source_id)?;
        for (i, id) in self.neighbor_ids.iter().enumerate() {
            if i > 0 { f.write_str(",")?; }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Result of a full run: one entry per document in corpus order, plus the
/// recoverable problems met along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborMapping {
    pub entries: Vec<NeighborEntry>,
    pub warnings: Vec<RunWarning>,
}

impl NeighborMapping {
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
