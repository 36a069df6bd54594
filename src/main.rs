use clap::{Arg, ArgMatches, Command};
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn, Level};

use mcp_pdf_embedder::mcp::server::McpServer;
use mcp_pdf_embedder::mcp::transport::StdioTransport;
use mcp_pdf_embedder::utils::embed_html::{EmbedBuilder, DEFAULT_CSS_CLASS};
use mcp_pdf_embedder::utils::embedder::PdfEmbedder;
use mcp_pdf_embedder::utils::media_library::{LibraryError, MediaLibrary};

#[derive(Debug, Clone, PartialEq)]
struct Config {
    library: Option<PathBuf>,
    css_class: String,
    quiet: bool,
}

impl Config {
    /// Command line first, then environment, then defaults.
    fn from_matches(matches: &ArgMatches) -> Self {
        let library = matches
            .get_one::<String>("library")
            .cloned()
            .or_else(|| env::var("PDF_EMBEDDER_LIBRARY").ok())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        let css_class = matches
            .get_one::<String>("css-class")
            .cloned()
            .or_else(|| env::var("PDF_EMBEDDER_CSS_CLASS").ok())
            .filter(|class| !class.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CSS_CLASS.to_string());

        Self {
            library,
            css_class,
            quiet: matches.get_flag("quiet"),
        }
    }

    /// `RUST_LOG` wins when it names a level; quiet mode only logs errors.
    fn log_level(&self) -> Level {
        env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(if self.quiet { Level::ERROR } else { Level::INFO })
    }
}

fn command() -> Command {
    Command::new("mcp-pdf-embedder")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Model Context Protocol server for embedding PDF files")
        .author("Ivan Mezentsev")
        .long_about(
            "This MCP server provides the following tools:\n\
            - pdf-embed: Embed PDF URLs that stand alone on a line of post content\n\
            - pdf-block: Render the markup of a PDF block from its attributes\n\
            - pdf-media-insert: Editor text for a media library attachment",
        )
        .arg(
            Arg::new("library")
                .long("library")
                .value_name("PATH")
                .help("JSON file with the media library attachments")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("css-class")
                .long("css-class")
                .value_name("CLASS")
                .help("CSS class for the object and iframe elements")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Suppress the startup banner and log errors only")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Prints a boxed banner to stderr; stdout carries JSON-RPC.
fn print_box(lines: &[&str]) {
    const BOX_WIDTH: usize = 60;
    const CONTENT_WIDTH: usize = BOX_WIDTH - 4;

    eprintln!("\n\x1b[36m╔{}╗", "═".repeat(BOX_WIDTH - 2));
    for line in lines {
        let visible_len = strip_ansi_codes(line).chars().count();
        let padding = CONTENT_WIDTH.saturating_sub(visible_len);
        let left = padding / 2;
        eprintln!(
            "║  {}{}{}\x1b[36m  ║",
            " ".repeat(left),
            line,
            " ".repeat(padding - left)
        );
    }
    eprintln!("╚{}╝\x1b[0m\n", "═".repeat(BOX_WIDTH - 2));
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch != '\x1b' {
            result.push(ch);
            continue;
        }
        if chars.next() == Some('[') {
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        }
    }

    result
}

fn build_embedder(config: &Config) -> Result<PdfEmbedder, LibraryError> {
    let library = match &config.library {
        Some(path) => {
            let library = MediaLibrary::load(path)?;
            if library.is_empty() {
                warn!("Media library {} has no attachments", path.display());
            }
            library
        }
        None => {
            info!("No media library configured; every PDF URL is treated as external");
            MediaLibrary::default()
        }
    };
    Ok(PdfEmbedder::with_library(
        library,
        EmbedBuilder::new(config.css_class.clone()),
    ))
}

#[tokio::main]
async fn main() {
    let matches = command().get_matches();
    let config = Config::from_matches(&matches);

    // stdout is reserved for JSON-RPC
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level())
        .init();

    let embedder = match build_embedder(&config) {
        Ok(embedder) => Arc::new(embedder),
        Err(e) => {
            error!("Failed to load media library: {}", e);
            process::exit(1);
        }
    };
    info!("Embedding with CSS class \"{}\"", config.css_class);

    if !config.quiet {
        print_box(&[
            "",
            "\x1b[1m\x1b[31m MCP-PDF-Embedder \x1b[0m",
            "",
            "\x1b[0m Embed PDF files with an object viewer \x1b[0m",
            "\x1b[0m and a Google Docs fallback \x1b[0m",
            "",
        ]);
    }

    info!("Starting MCP server...");

    let mut server = McpServer::new(StdioTransport::stdio(), embedder);
    if let Err(e) = server.start().await {
        error!("Failed to start server: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_defaults() {
        let matches = command().get_matches_from([
            "mcp-pdf-embedder",
            "--library",
            "/srv/media.json",
            "--css-class",
            "file-embedder",
            "-q",
        ]);
        let config = Config::from_matches(&matches);

        assert_eq!(config.library, Some(PathBuf::from("/srv/media.json")));
        assert_eq!(config.css_class, "file-embedder");
        assert!(config.quiet);
    }

    #[test]
    fn strips_ansi_sequences() {
        assert_eq!(strip_ansi_codes("\x1b[1m\x1b[31m bold \x1b[0m"), " bold ");
        assert_eq!(strip_ansi_codes("plain"), "plain");
    }

    #[test]
    fn missing_library_file_fails() {
        let config = Config {
            library: Some(PathBuf::from("/nonexistent/media-library.json")),
            css_class: DEFAULT_CSS_CLASS.to_string(),
            quiet: true,
        };
        assert!(matches!(
            build_embedder(&config),
            Err(LibraryError::Io(_))
        ));
    }
}
