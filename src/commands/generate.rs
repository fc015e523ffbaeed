//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Blog;

/// Fetch posts from the CMS and render the site
pub async fn run(blog: &Blog, all: bool) -> Result<()> {
    let start = std::time::Instant::now();

    let store = blog.content_store()?;
    let generator = Generator::new(blog)?;
    let rendered = generator.generate(&store, all).await?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated listing and {} posts in {:.2}s",
        rendered.len(),
        duration.as_secs_f64()
    );

    Ok(())
}
