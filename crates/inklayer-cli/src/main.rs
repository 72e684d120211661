// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inklayer: turns a scanned document into a searchable PDF.
//
//   inklayer scan.tiff                 -> scan_searchable.pdf
//   inklayer scan.pdf -o out.pdf       -> out.pdf
//   inklayer photo.jpg --text          -> recognised text on stdout

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use inklayer_core::config::DEFAULT_SETTINGS_FILE;
use inklayer_core::error::Result;
use inklayer_core::human_errors::humanize_error;
use inklayer_core::{InputFormat, OcrDocument, Settings};
use inklayer_document::{SearchablePdfComposer, load_page_images};
use inklayer_ocr::{DocumentIntelligenceClient, analyze_with_timeout};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "inklayer",
    version,
    about = "Make scanned documents searchable with an invisible OCR text layer"
)]
struct Cli {
    /// Input file (.pdf, .tif, .tiff, .jpg, .jpeg, .png, .bmp)
    input: PathBuf,

    /// Settings file with the OCR service endpoint and key
    #[arg(short = 'c', long = "config", default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Output path (default: <input stem> + output suffix, next to the input)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Print the recognised text instead of creating a PDF
    #[arg(long = "text")]
    text: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            error!(%err, exit_status = human.exit_status, "Inklayer failed");
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::from(human.exit_status)
        }
    }
}

/// The whole pipeline. Nothing is written unless every step succeeds.
async fn run(cli: Cli) -> Result<()> {
    let format = InputFormat::from_path(&cli.input)?;
    let settings = Settings::load(&cli.config)?;
    let client = DocumentIntelligenceClient::new(&settings)?;

    if cli.text {
        let ocr = recognise(&client, &cli.input, format, &settings).await?;
        println!("{}", ocr.content);
        return Ok(());
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| derive_output_path(&cli.input, &settings.overlay.output_suffix));

    info!("Loading input file {}", cli.input.display());
    let images = load_page_images(&cli.input, format)?;

    let ocr = recognise(&client, &cli.input, format, &settings).await?;

    let title = cli
        .input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Inklayer Document".into());
    let report = SearchablePdfComposer::new(&settings.overlay)
        .with_title(title)
        .write(&images, &ocr, &output)?;

    info!(
        pages = report.pages,
        words = report.text_runs,
        skipped = report.skipped_words,
        "Searchable PDF created at {}",
        output.display()
    );
    Ok(())
}

async fn recognise(
    client: &DocumentIntelligenceClient,
    input: &Path,
    format: InputFormat,
    settings: &Settings,
) -> Result<OcrDocument> {
    let document = tokio::fs::read(input).await?;
    info!(bytes = document.len(), "Running OCR");
    analyze_with_timeout(
        client,
        &document,
        format,
        Duration::from_secs(settings.ocr.timeout_secs),
    )
    .await
}

/// `<dir>/<stem><suffix>`: the input's final extension is replaced by `suffix`.
fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderValue, Method, StatusCode};
    use axum::response::{IntoResponse, Response};
    use image::{Rgb, RgbImage};
    use inklayer_core::InklayerError;
    use inklayer_document::PdfReader;
    use serde_json::json;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("inklayer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn output_path_replaces_final_extension() {
        assert_eq!(
            derive_output_path(Path::new("/scans/letter.tiff"), "_searchable.pdf"),
            PathBuf::from("/scans/letter_searchable.pdf")
        );
        assert_eq!(
            derive_output_path(Path::new("archive.2024.PDF"), "_searchable.pdf"),
            PathBuf::from("archive.2024_searchable.pdf")
        );
        assert_eq!(
            derive_output_path(Path::new("scan.png"), ".ocr.pdf"),
            PathBuf::from("scan.ocr.pdf")
        );
    }

    #[test]
    fn arguments_parse_with_defaults() {
        let parsed = cli(&["scan.tif"]);
        assert_eq!(parsed.input, PathBuf::from("scan.tif"));
        assert_eq!(parsed.config, PathBuf::from("config.json"));
        assert!(parsed.output.is_none());
        assert!(!parsed.text);

        let parsed = cli(&["scan.pdf", "-c", "other.json", "-o", "out.pdf", "--text"]);
        assert_eq!(parsed.config, PathBuf::from("other.json"));
        assert_eq!(parsed.output, Some(PathBuf::from("out.pdf")));
        assert!(parsed.text);

        assert!(Cli::try_parse_from(["inklayer"]).is_err());
    }

    #[tokio::test]
    async fn unsupported_input_is_reported_before_settings() {
        let err = run(cli(&["notes.docx", "-c", "/nonexistent/config.json"]))
            .await
            .unwrap_err();
        assert!(matches!(err, InklayerError::UnsupportedInputFormat(_)));
        assert_eq!(humanize_error(&err).exit_status, 2);
    }

    #[tokio::test]
    async fn missing_settings_is_a_config_error() {
        let err = run(cli(&["scan.png", "-c", "/nonexistent/config.json"]))
            .await
            .unwrap_err();
        assert!(matches!(err, InklayerError::ConfigLoad(_)));
        assert_eq!(humanize_error(&err).exit_status, 3);
    }

    /// Minimal analyze service: accepts every document and reports one "Hello".
    async fn fake_service(State(base): State<String>, method: Method) -> Response {
        if method == Method::POST {
            let mut response = StatusCode::ACCEPTED.into_response();
            let location = format!("{base}/formrecognizer/documentModels/prebuilt-read/analyzeResults/1");
            response
                .headers_mut()
                .insert("operation-location", HeaderValue::from_str(&location).unwrap());
            return response;
        }
        axum::Json(json!({
            "status": "succeeded",
            "analyzeResult": {
                "content": "Hello",
                "pages": [{
                    "pageNumber": 1, "width": 1000, "height": 1400, "unit": "pixel",
                    "words": [{"content": "Hello", "polygon": [100,100,300,100,300,160,100,160]}]
                }]
            }
        }))
        .into_response()
    }

    async fn workspace_with_fake_service() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new().fallback(fake_service).with_state(base.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        let settings = json!({
            "DOCUMENT_INTELLIGENCE_URL": base,
            "DOCUMENT_INTELLIGENCE_KEY": "test-key",
            "ocr": { "poll_interval_ms": 5, "timeout_secs": 30 }
        });
        std::fs::write(&config, settings.to_string()).unwrap();

        let input = dir.path().join("letter.png");
        RgbImage::from_pixel(1000, 1400, Rgb([255, 255, 255]))
            .save(&input)
            .unwrap();
        (dir, config, input)
    }

    #[tokio::test]
    async fn end_to_end_creates_searchable_pdf_next_to_input() {
        let (dir, config, input) = workspace_with_fake_service().await;

        run(cli(&[input.to_str().unwrap(), "-c", config.to_str().unwrap()]))
            .await
            .unwrap();

        let output = dir.path().join("letter_searchable.pdf");
        let reader = PdfReader::open(&output).unwrap();
        assert_eq!(reader.page_count(), 1);
        let (w, h) = reader.media_box(1).unwrap();
        assert!((w - 565.714).abs() < 0.1);
        assert!((h - 792.0).abs() < 0.1);
    }

    #[tokio::test]
    async fn text_mode_writes_no_pdf() {
        let (dir, config, input) = workspace_with_fake_service().await;

        run(cli(&[input.to_str().unwrap(), "-c", config.to_str().unwrap(), "--text"]))
            .await
            .unwrap();

        assert!(!dir.path().join("letter_searchable.pdf").exists());
    }
}
