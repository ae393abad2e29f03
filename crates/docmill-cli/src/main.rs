use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docmill_core::extractor::diffbot::DiffbotExtractor;
use docmill_core::extractor::docintel::DocIntelExtractor;
use docmill_core::extractor::webpage::WebpageExtractor;
use docmill_core::{
    AppConfig, ContentType, ExtractionRequest, Pipeline, S3Store, Source, Tier, Tool,
};
use docmill_pdf_mupdf::MupdfExtractor;

/// docmill - Convert PDF files and webpages to markdown
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a PDF file or a webpage URL to markdown
    Convert {
        /// Path to a PDF file, or an http(s) URL
        input: String,

        /// Tool to use: mupdf, docintel, scraper or diffbot
        /// (defaults to the opensource tool for the input kind)
        #[arg(long)]
        tool: Option<String>,

        /// Write the markdown here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Upload the artifact to the configured bucket
        #[arg(long)]
        upload: bool,

        /// Print the full result as JSON instead of plain markdown
        #[arg(long)]
        json: bool,
    },

    /// Show each tool and whether it is configured
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Keep stdout clean for the markdown itself
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            input,
            tool,
            output,
            upload,
            json,
        } => convert(input, tool, output, upload, json).await,
        Command::Tools => tools(),
    }
}

fn build_pipeline(config: &AppConfig) -> Pipeline {
    Pipeline::new(reqwest::Client::new())
        .with_extractor(Tool::Mupdf, Arc::new(MupdfExtractor::new()))
        .with_extractor(Tool::Scraper, Arc::new(WebpageExtractor::new()))
        .with_extractor(
            Tool::DocIntel,
            Arc::new(DocIntelExtractor::new(config.azure.clone())),
        )
        .with_extractor(
            Tool::Diffbot,
            Arc::new(DiffbotExtractor::new(config.diffbot_token.clone())),
        )
}

async fn convert(
    input: String,
    tool: Option<String>,
    output: Option<PathBuf>,
    upload: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let (content_type, source) = classify_input(&input)?;

    let tool = match tool {
        Some(name) => name.parse::<Tool>().map_err(|e| {
            anyhow::anyhow!("{e}; expected one of mupdf, docintel, scraper, diffbot")
        })?,
        None => Tier::OpenSource.default_tool(content_type),
    };
    anyhow::ensure!(
        tool.supports(content_type),
        "tool '{tool}' does not support {content_type} input"
    );

    let mut pipeline = build_pipeline(&config);
    if upload {
        let storage = config
            .storage
            .as_ref()
            .context("--upload requires AWS_BUCKET_NAME (and credentials) in the environment")?;
        pipeline = pipeline.with_store(Arc::new(S3Store::connect(storage).await));
    }

    let request = ExtractionRequest {
        content_type,
        tool,
        source,
    };
    let done = pipeline.process(&request).await?;

    if json {
        let value = serde_json::json!({
            "document_id": done.document_id,
            "tool": done.tool.as_str(),
            "content_type": done.content_type.as_str(),
            "source": done.source,
            "timestamp": done.timestamp,
            "markdown": done.artifact.content,
            "info": done.document.info,
            "storage": done.storage,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match output {
        Some(path) => {
            std::fs::write(&path, done.artifact.content.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{}", done.artifact.content),
    }

    if let Some(refs) = &done.storage {
        eprintln!("uploaded {}", refs.markdown);
    }

    Ok(())
}

fn tools() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let pipeline = build_pipeline(&config);

    println!("{:<10} {:<12} {:<9} status", "tool", "tier", "input");
    for tool in Tool::ALL {
        let input = if tool.supports(ContentType::Pdf) {
            "pdf"
        } else {
            "webpage"
        };
        let status = if pipeline.tool_available(tool) {
            "available"
        } else {
            "not configured"
        };
        println!("{:<10} {:<12} {:<9} {status}", tool.as_str(), tool.tier().as_str(), input);
    }

    match &config.storage {
        Some(storage) => println!("storage: bucket '{}'", storage.bucket),
        None => println!("storage: not configured"),
    }

    Ok(())
}

/// Decide whether the input is a webpage URL or a local PDF path.
fn classify_input(input: &str) -> anyhow::Result<(ContentType, Source)> {
    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok((ContentType::Webpage, Source::Url(input.to_string())));
    }

    let path = PathBuf::from(input);
    anyhow::ensure!(path.exists(), "no such file: {input}");
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.pdf")
        .to_string();
    Ok((ContentType::Pdf, Source::File { path, filename }))
}
