use crate::document::{DocMeta, Document};
use crate::index::Index;
use crate::normalizer::NormalizerConfig;
use crate::vector::SparseVector;
use crate::DocId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

/// On-disk form of an [`Index`]. Postings and lookup maps are rebuilt on load.
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    config: NormalizerConfig,
    terms: Vec<String>,
    idf: Vec<f32>,
    documents: Vec<Document>,
    vectors: Vec<SparseVector>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn doc_id_map(&self) -> PathBuf { self.root.join("doc_id_map.bin") }
}

/// Write through a temporary file so a reader never sees a half-written one.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn save_index(paths: &IndexPaths, index: &Index) -> Result<()> {
    create_dir_all(&paths.root)?;
    let snapshot = IndexSnapshot {
        config: index.normalizer.config().clone(),
        terms: index.terms.clone(),
        idf: index.idf.clone(),
        documents: index.documents.clone(),
        vectors: index.vectors.clone(),
    };
    write_atomic(&paths.index(), &bincode::serialize(&snapshot)?)
}

pub fn load_index(paths: &IndexPaths) -> Result<Index> {
    let snapshot: IndexSnapshot = bincode::deserialize(&read_bytes(&paths.index())?)?;
    let index = Index::from_parts(snapshot.config, snapshot.terms, snapshot.idf, snapshot.documents, snapshot.vectors)?;
    Ok(index)
}

pub fn save_docs(paths: &IndexPaths, docs: &HashMap<DocId, DocMeta>) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_atomic(&paths.docs(), &bincode::serialize(docs)?)
}

pub fn load_docs(paths: &IndexPaths) -> Result<HashMap<DocId, DocMeta>> {
    let docs = bincode::deserialize(&read_bytes(&paths.docs())?)?;
    Ok(docs)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn save_doc_id_map(paths: &IndexPaths, map: &HashMap<String, DocId>) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_atomic(&paths.doc_id_map(), &bincode::serialize(map)?)
}

pub fn load_doc_id_map(paths: &IndexPaths) -> Result<HashMap<String, DocId>> {
    let map = bincode::deserialize(&read_bytes(&paths.doc_id_map())?)?;
    Ok(map)
}

/// Everything read back from an index directory.
pub struct StoredIndex {
    pub index: Index,
    /// Display fields per document.
    pub docs: HashMap<DocId, DocMeta>,
    /// External id (ISBN or `#<row>`) to document id.
    pub id_map: HashMap<String, DocId>,
    pub meta: MetaFile,
}

/// Load everything needed to serve queries.
pub fn load_all(paths: &IndexPaths) -> Result<StoredIndex> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        anyhow::bail!("unsupported index format version {} (expected {FORMAT_VERSION})", meta.version);
    }
    let index = load_index(paths)?;
    let docs = load_docs(paths)?;
    let id_map = load_doc_id_map(paths)?;
    if let Some((external_id, doc)) = id_map.iter().find(|(_, doc)| index.document(**doc).is_none()) {
        anyhow::bail!("doc id map points {external_id:?} at missing document {doc}");
    }
    Ok(StoredIndex { index, docs, id_map, meta })
}
