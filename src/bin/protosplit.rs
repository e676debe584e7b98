use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    /// The master document. Each `// # begin(name)` line starts a section that
    /// is written to `name.proto` in the current directory.
    input: PathBuf,
}

fn main() {
    // progress goes to stderr at INFO unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = protosplit::split(&args.input) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
