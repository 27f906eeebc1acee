//! Command line tool to search for shortest paths in the Wikipedia link
//! graph.
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use rand::Rng;
use tracing_subscriber::EnvFilter;

use linkpath::{
    find_shortest_path, find_shortest_path_dag, AnnotatedDag, GraphError, LinkOrder, LinkRef,
    MemoryLock, OpenOptions, PageId, PathEnumerator, Reader, SearchStats,
};

#[derive(Parser, Debug)]
#[command(
    name = "search",
    version,
    about = "Search for shortest paths in the Wikipedia link graph",
    after_help = "\
If <MODE> is omitted, a single shortest path is printed using an algorithm that
is slightly faster than `path` because it does not compute the DAG of all
shortest paths."
)]
struct Args {
    /// Path to the graph file; the metadata database is found next to it.
    graph: PathBuf,

    /// Start page: a title, "#id", or "?" for a random page.
    start: String,

    /// Finish page: a title, "#id", or "?" for a random page.
    finish: String,

    /// What to output; omit for the classic single-path search.
    #[arg(value_enum)]
    mode: Option<Mode>,

    /// Select a path uniformly at random (mode: path).
    #[arg(long)]
    random: bool,

    /// Skip the first N paths (mode: paths).
    #[arg(long, value_name = "N")]
    skip: Option<i64>,

    /// Print at most N paths (mode: paths).
    #[arg(long, value_name = "N")]
    max: Option<i64>,

    /// Enumerate paths ordered by this key (modes: path, paths).
    #[arg(long, value_enum)]
    order: Option<OrderArg>,

    /// Path enumeration method (modes: path, paths).
    #[arg(long, value_enum)]
    enumerate: Option<MethodArg>,

    /// How to pin the mapped graph file into memory.
    #[arg(long, value_enum, default_value_t = LockArg::None)]
    lock: LockArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Total number of shortest paths.
    Count,
    /// A single shortest path.
    Path,
    /// All shortest paths, one per line.
    Paths,
    /// The edges of the DAG of shortest paths, one per line.
    Edges,
    /// The DAG of shortest paths in GraphViz DOT format.
    Dot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OrderArg {
    Id,
    Title,
    Text,
}

impl From<OrderArg> for LinkOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Id => LinkOrder::Id,
            OrderArg::Title => LinkOrder::Title,
            OrderArg::Text => LinkOrder::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    Recursive,
    Iterative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LockArg {
    None,
    Foreground,
    Background,
    Populate,
}

impl From<LockArg> for MemoryLock {
    fn from(lock: LockArg) -> Self {
        match lock {
            LockArg::None => MemoryLock::None,
            LockArg::Foreground => MemoryLock::Foreground,
            LockArg::Background => MemoryLock::Background,
            LockArg::Populate => MemoryLock::Populate,
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

fn validate(args: &Args) -> linkpath::Result<()> {
    let invalid = |message: &str| Err(GraphError::InvalidArgument(message.into()));
    if args.random && args.mode != Some(Mode::Path) {
        return invalid("--random is only valid in path mode");
    }
    if args.skip.is_some() && args.mode != Some(Mode::Paths) {
        return invalid("--skip is only valid in paths mode");
    }
    if args.max.is_some() && args.mode != Some(Mode::Paths) {
        return invalid("--max is only valid in paths mode");
    }
    if matches!(args.skip, Some(skip) if skip < 0) {
        return invalid("--skip must not be negative");
    }
    if matches!(args.max, Some(max) if max < 0) {
        return invalid("--max must not be negative");
    }
    let enumerating = matches!(args.mode, Some(Mode::Path | Mode::Paths));
    if args.order.is_some() && !enumerating {
        return invalid("--order is only valid in path or paths mode");
    }
    if args.enumerate.is_some() && !enumerating {
        return invalid("--enumerate is only valid in path or paths mode");
    }
    Ok(())
}

fn run(args: &Args) -> linkpath::Result<()> {
    validate(args)?;

    let reader = Reader::open_with_options(
        &args.graph,
        OpenOptions {
            memory_lock: args.lock.into(),
        },
    )?;

    let start = reader.parse_page_argument(&args.start)?;
    let finish = reader.parse_page_argument(&args.finish)?;

    eprintln!(
        "Searching for a shortest path from {} to {}...",
        reader.page_ref(start),
        reader.page_ref(finish)
    );

    let Some(mode) = args.mode else {
        search_classic(&reader, start, finish);
        return Ok(());
    };

    let order = args.order.map(LinkOrder::from).unwrap_or_default();
    let method = args.enumerate.unwrap_or(MethodArg::Recursive);

    let mut stats = SearchStats::default();
    let dag_edges = find_shortest_path_dag(reader.graph(), start, finish, Some(&mut stats));
    dump_search_stats(&stats);

    let Some(edges) = dag_edges else {
        match mode {
            // For output consistency, print 0 when no path is found.
            Mode::Count => println!("0"),
            // Empty output when no path is found.
            Mode::Paths | Mode::Edges => {}
            _ => eprintln!("No path found!"),
        }
        return Ok(());
    };

    let dag = AnnotatedDag::new(&reader, start, finish, &edges);
    match mode {
        Mode::Count => println!("{}", dag.count_paths()),
        Mode::Path => print_single_path(&dag, order, method, args.random),
        Mode::Paths => print_paths(
            &dag,
            order,
            method,
            args.skip.unwrap_or(0),
            args.max.unwrap_or(i64::MAX),
        ),
        Mode::Edges => {
            for &(v, w) in &edges {
                println!("{} -> {}", reader.page_ref(v), reader.forward_link_ref(v, w));
            }
        }
        Mode::Dot => print_dot(&reader, &edges),
    }
    Ok(())
}

fn dump_search_stats(stats: &SearchStats) {
    eprintln!("Vertices reached:  {}", stats.vertices_reached);
    eprintln!("Vertices expanded: {}", stats.vertices_expanded);
    eprintln!("Edges expanded:    {}", stats.edges_expanded);
    eprintln!("Search time:       {} ms", stats.time_taken_ms);
}

fn search_classic(reader: &Reader, start: PageId, finish: PageId) {
    let mut stats = SearchStats::default();
    let path = find_shortest_path(reader.graph(), start, finish, Some(&mut stats));
    dump_search_stats(&stats);
    if path.is_empty() {
        eprintln!("No path found!");
        return;
    }
    for (i, &page) in path.iter().enumerate() {
        if i == 0 {
            println!("{}", reader.page_ref(page));
        } else {
            println!("{}", reader.forward_link_ref(path[i - 1], page));
        }
    }
}

/// Drives `callback` with each enumerated path, using the requested
/// enumerator implementation. Both produce the same sequence of paths.
fn enumerate_with<F>(
    method: MethodArg,
    dag: &AnnotatedDag,
    order: LinkOrder,
    skip: i64,
    mut callback: F,
) -> bool
where
    F: FnMut(&[LinkRef]) -> bool,
{
    match method {
        MethodArg::Recursive => dag.enumerate_paths(callback, skip, order),
        MethodArg::Iterative => {
            let mut enumerator = PathEnumerator::new(dag, skip, order);
            while enumerator.has_path() {
                if !callback(enumerator.path()) {
                    return false;
                }
                enumerator.advance();
            }
            true
        }
    }
}

/// Prints a single path through the DAG: the first one in the given
/// order, or a randomly selected one.
fn print_single_path(dag: &AnnotatedDag, order: LinkOrder, method: MethodArg, random: bool) {
    let mut skip = 0;
    if random {
        let path_count = dag.count_paths();
        skip = rand::thread_rng().gen_range(0..path_count);
        eprintln!("Randomly selected path {} of {}.", skip + 1, path_count);
    }
    enumerate_with(method, dag, order, skip, |path| {
        println!("{}", dag.start_ref());
        for &link in path {
            println!("{}", dag.forward_ref(link));
        }
        false // stop enumerating after the first result
    });
}

/// Prints the paths through the DAG in the given order, after skipping
/// the first `skip` and stopping after `max` of them.
fn print_paths(dag: &AnnotatedDag, order: LinkOrder, method: MethodArg, skip: i64, max: i64) {
    if max <= 0 {
        return;
    }
    let mut remaining = max;
    enumerate_with(method, dag, order, skip, |path| {
        let mut line = dag.start_ref();
        for &link in path {
            line.push_str(" -> ");
            line.push_str(&dag.forward_ref(link));
        }
        println!("{line}");
        remaining -= 1;
        remaining > 0
    });
}

/// Quotes a string for the DOT file format. Only '"' needs to be escaped,
/// although the `dot` command line tool also interprets escape sequences
/// like '\n'; backslashes in Wikipedia titles are rare enough not to
/// bother (pages like "\o/" do exist). See
/// <https://graphviz.org/doc/info/lang.html>.
fn dot_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if ch == '"' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

fn print_dot(reader: &Reader, edges: &[(PageId, PageId)]) {
    let mut title_by_page: HashMap<PageId, String> = HashMap::new();
    // Prints the label line the first time a page is mentioned.
    fn emit_vertex(reader: &Reader, titles: &mut HashMap<PageId, String>, v: PageId) {
        titles.entry(v).or_insert_with(|| {
            let title = reader.page_title(v);
            println!("{} [label={}];", v, dot_quoted(&title));
            title
        });
    }

    println!("digraph dag {{");
    for &(v, w) in edges {
        emit_vertex(reader, &mut title_by_page, v);
        emit_vertex(reader, &mut title_by_page, w);
        let dest_title = &title_by_page[&w];
        let text = reader.link_text(v, w);
        print!("{v} -> {w}");
        if text != *dest_title {
            print!(" [label={}]", dot_quoted(&text));
        }
        println!(";");
    }
    println!("}}");
}
