//! Generate static files

use anyhow::Result;

use crate::content::{ContentLoader, ContentType};
use crate::generator::Generator;
use crate::Folio;

/// Generate the static site
pub fn run(folio: &Folio) -> Result<()> {
    let start = std::time::Instant::now();

    let loader = ContentLoader::new(folio);

    // Two files claiming one URL is a configuration error
    for content_type in ContentType::ALL {
        loader.check_slugs(content_type)?;
    }

    let site = loader.load_site();
    tracing::info!(
        "Loaded {} posts, {} pages and {} audio excerpts",
        site.posts.len(),
        site.pages.len(),
        site.audio.len()
    );
    if site.home.is_none() {
        tracing::warn!("No home entry found under {:?}", loader.type_dir(ContentType::Home));
    }

    let generator = Generator::new(folio)?;
    generator.generate(&site)?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}

/// Watch for file changes and regenerate
pub async fn watch(folio: &Folio) -> Result<()> {
    tracing::info!("Watching for changes. Press Ctrl+C to stop.");
    let folio = folio.clone();
    tokio::task::spawn_blocking(move || crate::server::watch(folio, None)).await?
}
