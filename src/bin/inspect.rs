//! Debug-prints a vertex of the graph, with its outgoing and incoming
//! links.
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use linkpath::Reader;

#[derive(Parser, Debug)]
#[command(
    name = "inspect",
    version,
    about = "Inspect a page of the Wikipedia link graph"
)]
struct Args {
    /// Path to the graph file; the metadata database is found next to it.
    graph: PathBuf,

    /// Page to inspect: a title, "#id", or "?" for a random page. When
    /// omitted, only the graph dimensions are printed.
    page: Option<String>,
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

fn run(args: &Args) -> linkpath::Result<()> {
    let reader = Reader::open(&args.graph)?;

    let Some(page) = &args.page else {
        // Vertex 0 is the reserved sentinel, not a real page.
        println!("Vertices: {} (including the reserved 0)", reader.graph().vertex_count());
        println!("Edges:    {}", reader.graph().edge_count());
        return Ok(());
    };

    let page_id = reader.parse_page_argument(page)?;
    println!("{}", reader.page_ref(page_id));

    println!("Outgoing links:");
    for &w in reader.graph().forward_edges(page_id) {
        println!(" -> {}", reader.forward_link_ref(page_id, w));
    }

    println!("Incoming links:");
    for &v in reader.graph().backward_edges(page_id) {
        println!(" <- {}", reader.backward_link_ref(v, page_id));
    }
    Ok(())
}
