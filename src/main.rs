use std::path::PathBuf;

use feedcard::app::RunOptions;

fn main() {
    let opts = match handle_cli_flags() {
        Ok(Some(opts)) => opts,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    if let Err(err) = feedcard::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

/// Returns `None` when a flag was fully handled and the program should exit.
fn handle_cli_flags() -> Result<Option<RunOptions>, String> {
    let mut opts = RunOptions::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("feedcard {}", feedcard::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!(
                    "feedcard: a terminal feed of media cards.\n\n  --feed PATH          Load posts from a JSON or YAML file\n  --dump               Print how each post resolves and mounts, then exit\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message"
                );
                return Ok(None);
            }
            "--feed" => match args.next() {
                Some(path) => opts.feed_path = Some(PathBuf::from(path)),
                None => return Err("--feed expects a path".to_string()),
            },
            "--dump" => opts.dump = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Some(opts))
}
