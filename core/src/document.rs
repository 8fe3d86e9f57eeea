use crate::error::{Result, SearchError};
use crate::DocId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// One unit of the corpus. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    /// Caller facing identifier, e.g. an ISBN.
    pub external_id: String,
    pub raw_text: String,
    /// Filled in by the index builder with the index's own normalizer.
    #[serde(default)]
    pub normalized_terms: Vec<String>,
}

impl Document {
    pub fn new(id: DocId, raw_text: impl Into<String>) -> Self {
        Self { id, external_id: id.to_string(), raw_text: raw_text.into(), normalized_terms: Vec::new() }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = external_id.into();
        self
    }
}

/// Display fields carried next to the index for presenting results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub external_id: String,
    pub title: String,
    pub author: String,
    pub year: Option<String>,
    pub publisher: Option<String>,
}

/// Which field(s) of a record become the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextField {
    /// `title + " " + author`
    #[default]
    TitleAuthor,
    Description,
}

/// Validated output of [`ingest`]. The input rows are left untouched.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub catalog: HashMap<DocId, DocMeta>,
    pub id_map: HashMap<String, DocId>,
}

const ID_KEYS: &[&str] = &["id", "ISBN", "isbn"];
const TITLE_KEYS: &[&str] = &["title", "Book-Title"];
const AUTHOR_KEYS: &[&str] = &["author", "Book-Author"];
const YEAR_KEYS: &[&str] = &["year", "Year-Of-Publication"];
const PUBLISHER_KEYS: &[&str] = &["publisher", "Publisher"];
const DESCRIPTION_KEYS: &[&str] = &["description", "Description"];

fn field_text(row: &Value, keys: &[&str]) -> Option<String> {
    let obj = row.as_object()?;
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Prefix of external ids made up for rows that carry none.
const GENERATED_ID_PREFIX: char = '#';

/// External ids for every row: the supplied one, or `#<position>` for rows
/// without one. Generated ids are lengthened until they clash with no
/// supplied id, so a row can never take over another row's id.
fn external_ids(rows: &[Value]) -> Result<Vec<String>> {
    let supplied: Vec<Option<String>> = rows.iter().map(|row| field_text(row, ID_KEYS).filter(|id| !id.is_empty())).collect();
    let mut taken: HashSet<&str> = HashSet::with_capacity(rows.len());
    for id in supplied.iter().flatten() {
        if !taken.insert(id.as_str()) {
            return Err(SearchError::InvalidCorpus(format!("duplicate document id {id:?}")));
        }
    }
    Ok(supplied
        .iter()
        .enumerate()
        .map(|(pos, id)| match id {
            Some(id) => id.clone(),
            None => {
                let mut generated = format!("{GENERATED_ID_PREFIX}{pos}");
                while taken.contains(generated.as_str()) {
                    generated.insert(0, GENERATED_ID_PREFIX);
                }
                generated
            }
        })
        .collect())
}

/// Convert loosely typed rows into a corpus.
///
/// Document ids are row positions. Missing text fields become empty strings
/// rather than failing the whole corpus; duplicate supplied ids do fail it.
pub fn ingest(rows: &[Value], field: TextField) -> Result<Corpus> {
    let mut corpus = Corpus::default();
    let external_ids = external_ids(rows)?;
    for ((pos, row), external_id) in rows.iter().enumerate().zip(external_ids) {
        let id = DocId::try_from(pos).map_err(|_| SearchError::InvalidCorpus(format!("too many documents: {}", rows.len())))?;
        if !row.is_object() {
            tracing::warn!(row = pos, "record is not an object; indexing it as empty text");
        }
        corpus.id_map.insert(external_id.clone(), id);

        let title = field_text(row, TITLE_KEYS).unwrap_or_default();
        let author = field_text(row, AUTHOR_KEYS).unwrap_or_default();
        let raw_text = match field {
            TextField::TitleAuthor => format!("{title} {author}").trim().to_string(),
            TextField::Description => field_text(row, DESCRIPTION_KEYS).unwrap_or_default(),
        };
        if raw_text.is_empty() {
            tracing::debug!(row = pos, "record has no text for the chosen field");
        }

        corpus.catalog.insert(id, DocMeta {
            external_id: external_id.clone(),
            title,
            author,
            year: field_text(row, YEAR_KEYS).filter(|y| !y.is_empty()),
            publisher: field_text(row, PUBLISHER_KEYS).filter(|p| !p.is_empty()),
        });
        corpus.documents.push(Document::new(id, raw_text).with_external_id(external_id));
    }
    Ok(corpus)
}
