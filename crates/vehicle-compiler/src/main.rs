//!
//! Compile a Vehicle specification into SMT-Lib queries.
//!
//! Usage: `vehicle <spec.vcl> [--out-dir DIR] [--property NAME]`

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vehicle_vcl::{compile_source, format_error};

#[derive(Parser, Debug)]
#[command(name = "vehicle")]
#[command(about = "Compile a Vehicle specification into SMT-Lib queries")]
#[command(version = vehicle_vcl::VERSION)]
struct Args {
    /// Path to the specification file
    spec: PathBuf,

    /// Output directory for queries and sidecars
    #[arg(long = "out-dir", default_value = "build")]
    out_dir: PathBuf,

    /// Compile only the named property
    #[arg(long = "property")]
    property: Option<String>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let args = Args::parse();

    let source = match fs::read_to_string(&args.spec) {
        Ok(source) => source,
        Err(err) => {
            error!("Failed to read {}: {}", args.spec.display(), err);
            process::exit(1);
        }
    };

    let (sources, result) = compile_source(args.spec.clone(), source);
    let queries = match result {
        Ok(queries) => queries,
        Err(err) => {
            error!("{}", format_error(&err, &sources).trim_end());
            process::exit(1);
        }
    };

    let selected: Vec<_> = match &args.property {
        Some(name) => {
            let selected: Vec<_> = queries
                .into_iter()
                .filter(|q| q.property.as_str() == name)
                .collect();
            if selected.is_empty() {
                error!("No property named '{}' in {}", name, args.spec.display());
                process::exit(1);
            }
            selected
        }
        None => queries,
    };

    if let Err(err) = fs::create_dir_all(&args.out_dir) {
        error!("Failed to create {}: {}", args.out_dir.display(), err);
        process::exit(1);
    }

    for query in &selected {
        let query_path = args.out_dir.join(format!("{}.smtlib", query.property));
        if let Err(err) = fs::write(&query_path, &query.smtlib) {
            error!("Failed to write {}: {}", query_path.display(), err);
            process::exit(1);
        }

        // The driver stitches network binaries in meta-network order; the
        // sidecar records that order.
        let sidecar_path = args
            .out_dir
            .join(format!("{}.meta-network.json", query.property));
        let sidecar = match serde_json::to_string_pretty(&query.meta_network) {
            Ok(json) => json,
            Err(err) => {
                error!("Failed to encode meta-network sidecar: {}", err);
                process::exit(1);
            }
        };
        if let Err(err) = fs::write(&sidecar_path, sidecar) {
            error!("Failed to write {}: {}", sidecar_path.display(), err);
            process::exit(1);
        }

        info!(
            "Compiled property '{}' (meta-network: {}) to {}",
            query.property,
            query
                .meta_network
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            query_path.display()
        );
    }
}
