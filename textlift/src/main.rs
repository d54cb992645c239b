use std::path::{Path, PathBuf};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textlift::{
    write_extracted, Config, ImageAsset, LanguageSet, MediaType, OcrPipeline, PageSegMode,
};

#[derive(Parser)]
#[command(name = "textlift")]
#[command(about = "Extract text from an image with Tesseract OCR")]
struct Args {
    /// Image to read (PNG, JPEG, GIF, BMP, TIFF, WebP)
    file: PathBuf,

    /// Languages, `+`-joined (e.g. `eng+deu`), or `recommended` / `all`
    #[arg(long)]
    lang: Option<LanguageSet>,

    /// Page segmentation mode (auto, single-block, single-line, ...)
    #[arg(long)]
    psm: Option<PageSegMode>,

    /// Skip contrast preprocessing
    #[arg(long)]
    no_preprocess: bool,

    /// Contrast multiplier, 0.5 to 3.0
    #[arg(long)]
    contrast: Option<f32>,

    /// Only recognize these characters
    #[arg(long)]
    whitelist: Option<String>,

    /// Never recognize these characters
    #[arg(long)]
    blacklist: Option<String>,

    /// Declared media type; detected from content or extension when omitted
    #[arg(long)]
    media_type: Option<String>,

    /// Directory for `<name>_extracted.txt` (defaults to the image's directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Print the text instead of writing a file
    #[arg(long)]
    stdout: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "textlift=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    let mut settings = config.default_settings();
    if let Some(lang) = args.lang {
        settings.languages = lang;
    }
    if let Some(psm) = args.psm {
        settings.page_segmentation_mode = psm;
    }
    if args.no_preprocess {
        settings.enable_preprocessing = false;
    }
    if let Some(contrast) = args.contrast {
        settings.contrast_boost = contrast;
    }
    if let Some(whitelist) = args.whitelist {
        settings.whitelist_chars = whitelist;
    }
    if let Some(blacklist) = args.blacklist {
        settings.blacklist_chars = blacklist;
    }

    let bytes = tokio::fs::read(&args.file).await?;
    let media_type = args
        .media_type
        .clone()
        .unwrap_or_else(|| detect_media_type(&args.file, &bytes));
    let mut image = ImageAsset::new(bytes, media_type);
    if let Some(name) = args.file.file_name() {
        image = image.with_name(name.to_string_lossy());
    }

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel_token.clone()));

    tracing::info!(
        file = %args.file.display(),
        media_type = %image.declared_type(),
        languages = %settings.languages,
        "Extracting text"
    );

    let pipeline = OcrPipeline::new(&config.ocr);
    let result = pipeline
        .run_with_cancel(image.clone(), &settings, cancel_token, |event| {
            tracing::info!(percent = event.percent, "{}", event.stage.label());
        })
        .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("OCR failed: {}", e);
            return Err(anyhow::anyhow!(e.user_message()));
        }
    };

    for warning in &result.warnings {
        tracing::warn!("{}", warning);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if args.stdout {
        println!("{}", result.text);
    }

    if !args.stdout {
        let dir = args
            .output_dir
            .clone()
            .or_else(|| args.file.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        let path = write_extracted(&dir, &image, &result.text).await?;
        tracing::info!(
            confidence = result.confidence,
            elapsed_millis = result.elapsed_millis,
            "Saved {}",
            path.display()
        );
    }

    Ok(())
}

/// Content first, then the file extension. Unknown types pass through as
/// `application/octet-stream` so the pipeline reports them.
fn detect_media_type(path: &Path, bytes: &[u8]) -> String {
    if let Some(media_type) = MediaType::sniff(bytes) {
        return media_type.mime().to_string();
    }
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

async fn cancel_on_ctrl_c(cancel_token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Interrupt received, cancelling OCR...");
        cancel_token.cancel();
    }
}
