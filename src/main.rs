use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use placement_engine::net::{CatalogSource, StaticCatalogSource};
use placement_engine::{JsonFileStore, PageType, PlaceholderEmbed, PlacementSession};

/// Splice ad placements into a rendered HTML page.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Placement config (JSON); defaults apply when the file is missing
    #[arg(long)]
    config: PathBuf,

    /// Catalog snapshot (JSON)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Catalog endpoint queried with the site domain
    #[arg(long)]
    catalog_url: Option<String>,

    /// Site domain sent to the catalog backend
    #[arg(long, default_value = "localhost")]
    domain: String,

    /// Page type of the input (home, post, page, ...)
    #[arg(long)]
    page_type: PageType,

    /// Treat the input as the N-th excerpt of a listing page
    #[arg(long)]
    excerpt: Option<u32>,

    /// Print the effective rules instead of rendering
    #[arg(long)]
    dry_run: bool,

    /// Rendered HTML to fill
    input: PathBuf,
}

impl Cli {
    fn catalog_source(&self) -> Result<Box<dyn CatalogSource>> {
        if let Some(source) = self.remote_source()? {
            return Ok(source);
        }
        match &self.catalog {
            Some(path) => {
                let source = StaticCatalogSource::from_json_file(path)
                    .with_context(|| format!("failed to read catalog {}", path.display()))?;
                Ok(Box::new(source))
            }
            None => bail!("a catalog source is required (--catalog or --catalog-url)"),
        }
    }

    #[cfg(feature = "remote-catalog")]
    fn remote_source(&self) -> Result<Option<Box<dyn CatalogSource>>> {
        let Some(url) = &self.catalog_url else {
            return Ok(None);
        };
        let source = placement_engine::net::fetch::HttpCatalogSource::new(url)
            .with_context(|| format!("invalid catalog endpoint {}", url))?;
        Ok(Some(Box::new(source)))
    }

    #[cfg(not(feature = "remote-catalog"))]
    fn remote_source(&self) -> Result<Option<Box<dyn CatalogSource>>> {
        if self.catalog_url.is_some() {
            bail!("--catalog-url needs the remote-catalog feature");
        }
        Ok(None)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let source = cli.catalog_source()?;
    let store = JsonFileStore::new(&cli.config);
    let session = PlacementSession::load(source.as_ref(), store, &cli.domain)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    let embed = PlaceholderEmbed;
    let mut cycle = session.render(cli.page_type, &embed);
    let mut stdout = io::stdout().lock();

    if cli.dry_run {
        for effective in cycle.effective_rules() {
            writeln!(
                stdout,
                "{}\t{}\t{:?}\t{}",
                effective.placement.position_id,
                effective.placement.name,
                effective.mode(),
                effective.rule.display_option
            )?;
        }
        return Ok(());
    }

    let input = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let output = match cli.excerpt {
        Some(ordinal) => cycle.filter_excerpt(&input, ordinal),
        None => cycle.filter_content(&input),
    };
    stdout.write_all(output.as_bytes())?;

    let tracker = cycle.finish();
    log::info!("{} placements inserted", tracker.len());
    Ok(())
}
