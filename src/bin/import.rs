//! Builds a graph file and its metadata database from pre-extracted page
//! and link tables.
//!
//! The expected input is what a wiki dump extractor produces: a CSV of
//! `id,title` page records and a CSV of `from,to[,title]` link records,
//! both without a header row. A link record with only two fields has no
//! display title; a present-but-empty third field is the empty title that
//! triggers the pipe trick at query time.
#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use csv::ReaderBuilder;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use linkpath::graph::{derive_backward_edges, write_graph_file};
use linkpath::{MetadataWriter, PageId};

/// Log only 1 out of every 1,000 messages about skipped records.
const SKIP_LOG_INTERVAL: u64 = 1000;

#[derive(Parser, Debug)]
#[command(
    name = "import",
    version,
    about = "Build a graph file and metadata database from page and link tables"
)]
struct Args {
    /// CSV file with one `id,title` record per page (no header row).
    #[arg(long, value_name = "FILE")]
    pages: PathBuf,

    /// CSV file with one `from,to[,title]` record per link (no header row).
    #[arg(long, value_name = "FILE")]
    links: PathBuf,

    /// Output graph file; the metadata database is written next to it.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
}

#[derive(Error, Debug)]
enum ImportError {
    #[error(transparent)]
    Graph(#[from] linkpath::GraphError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

/// Counts skipped records of one kind, logging a rate-limited sample.
struct SkippedCounter {
    label: &'static str,
    count: u64,
}

impl SkippedCounter {
    fn new(label: &'static str) -> Self {
        Self { label, count: 0 }
    }

    fn skip(&mut self, detail: &str) {
        self.count += 1;
        if self.count % SKIP_LOG_INTERVAL == 1 {
            warn!("ignoring {}: {} ({} so far)", self.label, detail, self.count);
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), ImportError> {
    let pages = read_pages(args)?;
    let vertex_count = pages.keys().max().copied().unwrap_or(0) as usize + 1;

    let (forward, link_titles) = read_links(args, &pages, vertex_count)?;
    let backward = derive_backward_edges(&forward);

    write_graph_file(&args.output, &forward, &backward)?;

    let metadata_path = args.output.with_extension("metadata");
    if metadata_path.exists() {
        std::fs::remove_file(&metadata_path)?;
    }
    let writer = MetadataWriter::create(&metadata_path)?;
    writer.begin()?;
    let mut page_ids: Vec<PageId> = pages.keys().copied().collect();
    page_ids.sort_unstable();
    for id in &page_ids {
        writer.insert_page(*id, &pages[id])?;
    }
    for (&(from, to), title) in &link_titles {
        writer.insert_link(from, to, title.as_deref())?;
    }
    writer.commit()?;

    let edge_count: usize = forward.iter().map(Vec::len).sum();
    println!(
        "Imported {} pages and {} links into {} and {}.",
        page_ids.len(),
        edge_count,
        args.output.display(),
        metadata_path.display()
    );
    Ok(())
}

fn read_pages(args: &Args) -> Result<HashMap<PageId, String>, ImportError> {
    let mut pages: HashMap<PageId, String> = HashMap::new();
    let mut titles: HashSet<String> = HashSet::new();
    let mut skipped = SkippedCounter::new("page");

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&args.pages)?;
    for record in csv_reader.records() {
        let record = record?;
        let (Some(id), Some(title)) = (record.get(0), record.get(1)) else {
            return Err(ImportError::Message(
                "page record needs an id and a title".into(),
            ));
        };
        let Ok(id) = id.parse::<PageId>() else {
            skipped.skip(&format!("malformed id [{id}]"));
            continue;
        };
        if id == 0 {
            skipped.skip("id 0 is reserved");
            continue;
        }
        if title.is_empty() {
            skipped.skip(&format!("page {id} has an empty title"));
            continue;
        }
        if pages.contains_key(&id) {
            skipped.skip(&format!("duplicate page id {id}"));
            continue;
        }
        if !titles.insert(title.to_owned()) {
            skipped.skip(&format!("duplicate title [{title}]"));
            continue;
        }
        pages.insert(id, title.to_owned());
    }

    if pages.is_empty() {
        return Err(ImportError::Message("no valid pages in input".into()));
    }
    Ok(pages)
}

type LinkTitles = HashMap<(PageId, PageId), Option<String>>;

fn read_links(
    args: &Args,
    pages: &HashMap<PageId, String>,
    vertex_count: usize,
) -> Result<(Vec<Vec<PageId>>, LinkTitles), ImportError> {
    let mut forward: Vec<Vec<PageId>> = vec![Vec::new(); vertex_count];
    let mut link_titles: LinkTitles = HashMap::new();
    let mut skipped = SkippedCounter::new("link");

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&args.links)?;
    for record in csv_reader.records() {
        let record = record?;
        let (Some(from), Some(to)) = (record.get(0), record.get(1)) else {
            return Err(ImportError::Message(
                "link record needs a source and a target".into(),
            ));
        };
        let (Ok(from), Ok(to)) = (from.parse::<PageId>(), to.parse::<PageId>()) else {
            skipped.skip(&format!("malformed endpoints [{from},{to}]"));
            continue;
        };
        if from == to {
            skipped.skip(&format!("self-loop on page {from}"));
            continue;
        }
        if !pages.contains_key(&from) || !pages.contains_key(&to) {
            skipped.skip(&format!("dangling link {from}->{to}"));
            continue;
        }
        if link_titles.contains_key(&(from, to)) {
            skipped.skip(&format!("duplicate link {from}->{to}"));
            continue;
        }
        link_titles.insert((from, to), record.get(2).map(str::to_owned));
        forward[from as usize].push(to);
    }

    for adjacency in &mut forward {
        adjacency.sort_unstable();
    }
    Ok((forward, link_titles))
}
