use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{debug, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Turtle,
    Ntriples,
}

/// Extracts the RDFa statements of an HTML document.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// A file, an http(s) URL, or `-` for standard input.
    #[arg(value_name = "INPUT")]
    input: String,

    /// Base IRI of the document. Defaults to its URL or `file://` path.
    #[arg(long)]
    base: Option<String>,

    /// Writes blank nodes in N-Triples output as IRIs under this prefix.
    #[arg(long, value_name = "IRI")]
    well_known_prefix: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Turtle)]
    format: Format,

    /// Also print processor warnings, as Turtle, to standard error.
    #[arg(long)]
    processor_graph: bool,
}

enum Input {
    Stdin,
    Url(url::Url),
    File(PathBuf),
}

impl Input {
    fn new(input: &str) -> Self {
        if input == "-" {
            return Input::Stdin;
        }

        match url::Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Input::Url(url),
            _ => Input::File(PathBuf::from(input)),
        }
    }

    fn default_base(&self) -> Result<String, Box<dyn std::error::Error>> {
        let url = match self {
            Input::Url(url) => url.clone(),
            Input::File(path) => url::Url::from_file_path(std::fs::canonicalize(path)?)
                .map_err(|()| format!("cannot make a file URL from {}", path.display()))?,
            Input::Stdin => url::Url::from_directory_path(std::env::current_dir()?)
                .map_err(|()| "cannot make a file URL from the current directory")?,
        };
        Ok(url.to_string())
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let input = Input::new(&args.input);

    let base = match args.base {
        Some(base) => base,
        None => input.default_base()?,
    };
    debug!("Using base <{base}>");

    let content = match &input {
        Input::Stdin => {
            let mut content = String::new();
            std::io::stdin().lock().read_to_string(&mut content)?;
            content
        }
        Input::File(path) => std::fs::read_to_string(path)?,
        Input::Url(url) => {
            let client = reqwest::blocking::Client::new();
            let response = client.get(url.clone()).send()?.error_for_status()?;
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());

            if content_type.is_some_and(|ct| !ct.starts_with("text/html")) {
                eprintln!("Error: content type is not text/html.");
                return Ok(ExitCode::FAILURE);
            }

            response.text()?
        }
    };

    let document = scraper::Html::parse_document(&content);
    let extraction = rdfa2ttl::extract_with_processor_graph(
        &document,
        &base,
        args.well_known_prefix.as_deref(),
    )?;

    info!(
        "Extracted {} triples ({} processor triples)",
        extraction.output.len(),
        extraction.processor.len()
    );

    if args.processor_graph {
        eprint!("{}", rdfa2ttl::to_turtle(&extraction.processor));
    }

    match args.format {
        Format::Turtle => print!("{}", rdfa2ttl::to_turtle(&extraction.output)),
        Format::Ntriples => print!("{}", extraction.output.to_ntriples()),
    }

    Ok(ExitCode::SUCCESS)
}
