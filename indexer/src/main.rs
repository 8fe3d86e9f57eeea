use anyhow::Result;
use bookrank_core::chat::ChatSession;
use bookrank_core::persist::{load_all, save_doc_id_map, save_docs, save_index, save_meta, IndexPaths, MetaFile, FORMAT_VERSION};
use bookrank_core::{ingest, CorpusStats, IndexBuilder, NormalizerConfig, RankOptions, Stopwords, TermReducer, TextField, DEFAULT_K};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a TF-IDF book index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    /// Title followed by author
    TitleAuthor,
    Description,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReducerArg {
    Lemma,
    Stem,
    None,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        output: String,
        /// Which record field(s) to index
        #[arg(long, value_enum, default_value_t = FieldArg::TitleAuthor)]
        text_field: FieldArg,
        /// How tokens are reduced to terms
        #[arg(long, value_enum, default_value_t = ReducerArg::Lemma)]
        reducer: ReducerArg,
        /// Keep English stopwords
        #[arg(long, default_value_t = false)]
        keep_stopwords: bool,
    },
    /// Rank the indexed documents against a query
    Query {
        #[arg(long, default_value = "./index")]
        index: String,
        /// Query text
        q: String,
        #[arg(long, default_value_t = DEFAULT_K)]
        k: usize,
        /// Hide results scoring below this
        #[arg(long)]
        min_score: Option<f32>,
    },
    /// Interactive recommendation chat; type 'quit' to exit
    Chat {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long, default_value_t = DEFAULT_K)]
        k: usize,
    },
    /// Print corpus statistics
    Stats {
        #[arg(long, default_value = "./index")]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, text_field, reducer, keep_stopwords } => {
            let field = match text_field {
                FieldArg::TitleAuthor => TextField::TitleAuthor,
                FieldArg::Description => TextField::Description,
            };
            let config = NormalizerConfig {
                stopwords: if keep_stopwords { Stopwords::None } else { Stopwords::English },
                reducer: match reducer {
                    ReducerArg::Lemma => TermReducer::Lemma,
                    ReducerArg::Stem => TermReducer::Stem,
                    ReducerArg::None => TermReducer::None,
                },
                ..Default::default()
            };
            build_index(&input, &output, field, config)
        }
        Commands::Query { index, q, k, min_score } => query(&index, &q, RankOptions { k, min_score }),
        Commands::Chat { index, k } => chat(&index, k),
        Commands::Stats { index } => stats(&index),
    }
}

fn build_index(input: &str, output: &str, field: TextField, config: NormalizerConfig) -> Result<()> {
    let input_path = Path::new(input);
    let out_paths = IndexPaths::new(output);

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        anyhow::bail!("input path {input} does not exist");
    }

    let mut rows: Vec<Value> = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut rows)?;
        } else {
            read_json(&file, &mut rows)?;
        }
    }
    tracing::info!(num_rows = rows.len(), "read input records");

    let corpus = ingest(&rows, field)?;
    let index = IndexBuilder::with_config(config).build(corpus.documents)?;

    save_index(&out_paths, &index)?;
    save_docs(&out_paths, &corpus.catalog)?;
    save_doc_id_map(&out_paths, &corpus.id_map)?;
    let meta = MetaFile {
        num_docs: index.len() as u32,
        num_terms: index.vocabulary_size() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
        version: FORMAT_VERSION,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output, num_docs = meta.num_docs, num_terms = meta.num_terms, "index build complete");
    Ok(())
}

fn read_jsonl(file: &Path, rows: &mut Vec<Value>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        match serde_json::from_str(&line) {
            Ok(v) => rows.push(v),
            // a broken line is skipped rather than failing the whole file
            Err(e) => tracing::warn!(file = %file.display(), line = lineno + 1, error = %e, "skipping bad line"),
        }
    }
    Ok(())
}

fn read_json(file: &Path, rows: &mut Vec<Value>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: Value = serde_json::from_reader(reader)?;
    match json {
        Value::Array(arr) => rows.extend(arr),
        Value::Object(_) => rows.push(json),
        _ => tracing::warn!(file = %file.display(), "ignoring file without records"),
    }
    Ok(())
}

fn query(index_dir: &str, q: &str, opts: RankOptions) -> Result<()> {
    let stored = load_all(&IndexPaths::new(index_dir))?;
    let hits = stored.index.rank_with(q, opts)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (rank, hit) in hits.iter().enumerate() {
        let (external_id, title) = stored
            .docs
            .get(&hit.document_id)
            .map(|m| (m.external_id.as_str(), m.title.as_str()))
            .unwrap_or(("", ""));
        writeln!(out, "{:>3}. {:.4}  [{}] {}", rank + 1, hit.score, external_id, title)?;
    }
    Ok(())
}

fn chat(index_dir: &str, k: usize) -> Result<()> {
    let stored = load_all(&IndexPaths::new(index_dir))?;
    let mut session = ChatSession::new(k);
    println!("Book Recommendation Chatbot");
    println!("Type 'quit' to exit");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("You: ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 { break; }
        let message = line.trim();
        if message.eq_ignore_ascii_case("quit") { break; }
        let reply = session.handle_message(&stored.index, &stored.docs, message)?;
        println!("Bot: {reply}");
    }
    Ok(())
}

fn stats(index_dir: &str) -> Result<()> {
    let stored = load_all(&IndexPaths::new(index_dir))?;
    let stats = CorpusStats::collect(&stored.index, &stored.docs);

    println!("Total number of books: {}", stats.num_docs);
    println!("Vocabulary size: {}", stats.vocabulary_size);
    println!("Number of unique authors: {}", stats.unique_authors);
    println!("Number of unique publishers: {}", stats.unique_publishers);
    match stats.year_range {
        Some((lo, hi)) => println!("Year range: {lo} - {hi}"),
        None => println!("Year range: unknown"),
    }
    println!("Built at: {}", stored.meta.created_at);
    Ok(())
}
