use std::path::PathBuf;

use reel_tui::app::RunOptions;

const HELP: &str = "Reel-TUI - Search and browse the OMDb movie database from the terminal.

  --version, -V        Show version and exit
  --help,    -h        Show this help message
  --config <path>      Read configuration from <path>
  --demo               Browse a built-in catalog without an API key

The OMDb API key is read from OMDB_API_KEY, REEL_TUI_OMDB__API_KEY
or omdb.api_key in the config file.";

fn main() {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(Some(opts)) => opts,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    if let Err(err) = reel_tui::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<RunOptions>, String> {
    let mut opts = RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Reel-TUI {}", reel_tui::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(None);
            }
            "--demo" => opts.demo = true,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| "--config requires a path".to_string())?;
                opts.config_file = Some(PathBuf::from(path));
            }
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    opts.config_file = Some(PathBuf::from(path));
                } else {
                    return Err(format!("unknown argument {other:?} (see --help)"));
                }
            }
        }
    }
    Ok(Some(opts))
}
