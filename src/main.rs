use anyhow::{anyhow, Context};
use clap::Parser;
use rfsnapshot::css::StyleSheet;
use rfsnapshot::{snapshot, CloneOptions, Document};
use scraper::Selector;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rfsnapshot", version, about = "Snapshot an HTML subtree into inert, styled markup")]
struct Cli {
    /// HTML file to snapshot
    input: PathBuf,
    /// Selector of the snapshot root
    #[arg(long, default_value = "body")]
    selector: String,
    /// Style sheets: fills a `<link>` with the same href, else appended
    #[arg(long)]
    css: Vec<PathBuf>,
    /// Base URL for relative resource references
    #[arg(long)]
    base_url: Option<String>,
    /// Prune elements matching this selector (repeatable)
    #[arg(long)]
    exclude: Vec<String>,
    /// Print a JSON report instead of markup
    #[arg(long)]
    json: bool,
    /// Timeout for resource fetches in milliseconds
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let markup = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let mut doc = Document::parse(&markup);
    if let Some(base) = &cli.base_url {
        doc = doc.with_base_url(base)?;
    }
    for path in &cli.css {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let href = path.display().to_string();
        if !doc.load_style_sheet(&href, &text) {
            doc.add_style_sheet(StyleSheet::parse(&text).with_href(href));
        }
    }

    let root = doc
        .query(&cli.selector)?
        .with_context(|| format!("no element matches {}", cli.selector))?;

    let mut options = CloneOptions::default();
    if !cli.exclude.is_empty() {
        let excluded = cli
            .exclude
            .iter()
            .map(|s| Selector::parse(s).map_err(|_| anyhow!("invalid --exclude selector: {}", s)))
            .collect::<anyhow::Result<Vec<_>>>()?;
        options = options.with_filter(move |node| !excluded.iter().any(|sel| node.matches(sel)));
    }
    #[cfg(feature = "fetch")]
    {
        options = options.with_resolver(rfsnapshot::FetchResolver::new(cli.timeout_ms)?);
    }
    #[cfg(not(feature = "fetch"))]
    log::debug!("fetch disabled, ignoring timeout of {}ms", cli.timeout_ms);

    let snap = snapshot(&doc, root, &options).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snap.report())?);
    } else {
        println!("{}", snap.to_html());
    }
    Ok(())
}
