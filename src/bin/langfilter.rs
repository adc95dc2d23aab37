//! Reads one title per line from stdin and prints `keep` or `hide` for each.
//!
//! ```bash
//! printf 'How to cook rice\nBu bir Türkçe başlıktır\n' | langfilter --lang en
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use langfilter::{DetectionConfig, DetectionService, LanguageIdentifier, WhatlangIdentifier};

#[derive(Parser, Debug)]
#[command(name = "langfilter")]
#[command(about = "Keep titles written in the selected languages, hide the rest")]
struct Args {
    /// JSON config file (camelCase keys)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target language code; repeatable. Overrides the config selection.
    #[arg(long = "lang")]
    langs: Vec<String>,

    /// Accept low-confidence detections
    #[arg(long)]
    lenient: bool,

    /// Context tag selecting a threshold from `contextThresholds`
    #[arg(long)]
    context: Option<String>,

    /// Skip the identifier and use only the keyword fallback
    #[arg(long)]
    no_identifier: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    langfilter::init_tracing(args.json_logs);

    let config = match &args.config {
        Some(path) => DetectionConfig::load_from_file(path).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "config load failed, using defaults");
            DetectionConfig::default()
        }),
        None => DetectionConfig::default(),
    };

    let identifier: Option<Arc<dyn LanguageIdentifier>> = if args.no_identifier {
        None
    } else {
        Some(Arc::new(WhatlangIdentifier::new()))
    };

    let service = Arc::new(DetectionService::new(&config, identifier));
    if !args.langs.is_empty() {
        service.set_target_languages(&args.langs);
    }
    if args.lenient {
        service.set_strict_mode(false);
    }
    if service.target_languages().is_empty() {
        warn!("no known target languages selected, every title will be hidden");
    }
    let handle = service.start();

    let targets = service.target_languages();
    let strict = service.strict_mode();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let title = line.trim();
        if title.is_empty() {
            continue;
        }
        let keep = match &args.context {
            Some(ctx) => service.detect_in_context(title, &targets, strict, ctx).await,
            None => service.detect(title, &targets, strict).await,
        };
        println!("{}\t{}", if keep { "keep" } else { "hide" }, title);
    }

    handle.shutdown().await;
    let stats = serde_json::to_string(&service.stats()).map_err(std::io::Error::other)?;
    eprintln!("{stats}");
    Ok(())
}
