//! Generator module - renders posts fetched from the CMS into static HTML

use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tera::Context;
use walkdir::WalkDir;

use crate::cache::{hash_content, RenderCache};
use crate::cms::{ContentStore, Predicate, QueryOptions};
use crate::content::reading_time::reading_time_with;
use crate::content::{as_html, normalize_detail, normalize_page, Post, PostDetail, PostPage};
use crate::helpers::{date_xml, format_date, is_valid_slug, post_output};
use crate::i18n::I18n;
use crate::listing::{ListingOptions, PaginatedListing};
use crate::templates::{
    PostCard, PostView, SectionData, SiteData, TemplateRenderer, STYLESHEET,
};
use crate::Blog;

/// Result of rendering a single post page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    Generated,
    /// The CMS has no post with this uid; any stale page was removed
    NotFound,
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    i18n: I18n,
    cache: Mutex<RenderCache>,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let mut i18n = I18n::new(&blog.config.language);
        i18n.load_languages(&blog.i18n_dir)?;
        let cache = RenderCache::load(&blog.base_dir);

        Ok(Self {
            blog: blog.clone(),
            renderer,
            i18n,
            cache: Mutex::new(cache),
        })
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    /// Generate the site: listing page, detail pages and assets
    ///
    /// Detail pages are rendered for the first listing page, or for every
    /// post when `all` is set. Returns the uids whose pages were rendered.
    pub async fn generate(&self, store: &Arc<dyn ContentStore>, all: bool) -> Result<Vec<String>> {
        fs::create_dir_all(&self.blog.public_dir)?;

        self.write_stylesheet()?;
        self.copy_static_assets()?;
        self.generate_not_found()?;

        let cms = &self.blog.config.cms;
        let raw = store
            .query(
                &[Predicate::document_type(&cms.document_type)],
                &QueryOptions::page_size(cms.page_size),
            )
            .await
            .context("Failed to query posts")?;
        let first = normalize_page(&raw)?;
        tracing::info!("Fetched {} posts", first.results.len());

        self.generate_listing(&first)?;

        let posts = if all && first.has_next() {
            let options = ListingOptions {
                dedupe_by_uid: self.blog.config.dedupe_by_uid,
            };
            let listing = PaginatedListing::with_options(Arc::clone(store), options);
            listing.initialize(first)?;
            let loaded = listing.load_all().await?;
            tracing::debug!("Loaded {} more posts", loaded);
            listing.into_posts()
        } else {
            first.results
        };

        let mut rendered = Vec::with_capacity(posts.len());
        for post in &posts {
            match self.generate_detail(store.as_ref(), &post.uid).await? {
                DetailOutcome::Generated => rendered.push(post.uid.clone()),
                DetailOutcome::NotFound => {
                    tracing::warn!("Post {} is listed but could not be fetched", post.uid)
                }
            }
        }

        self.save_cache()?;
        Ok(rendered)
    }

    /// Render `index.html` for the first listing page
    pub fn generate_listing(&self, page: &PostPage) -> Result<()> {
        let html = self.render_listing(page)?;
        self.write_output(Path::new("index.html"), &html)?;
        Ok(())
    }

    pub fn render_listing(&self, page: &PostPage) -> Result<String> {
        let cards: Vec<PostCard> = page.results.iter().map(|p| self.post_card(p)).collect();

        let mut context = self.create_base_context();
        context.insert("posts", &cards);
        context.insert("next_page", &page.next_page);

        self.renderer.render("index.html", &context)
    }

    /// Fetch one post by uid and render its page
    pub async fn generate_detail(&self, store: &dyn ContentStore, uid: &str) -> Result<DetailOutcome> {
        if !is_valid_slug(uid) {
            return Ok(DetailOutcome::NotFound);
        }
        let output = post_output(uid);

        let doc = store
            .get_by_uid(&self.blog.config.cms.document_type, uid)
            .await
            .with_context(|| format!("Failed to fetch post {}", uid))?;

        let Some(doc) = doc else {
            self.remove_output(&output)?;
            return Ok(DetailOutcome::NotFound);
        };

        let post = normalize_detail(&doc)?;
        let html = self.render_detail(&post)?;
        self.write_output(&output, &html)?;
        Ok(DetailOutcome::Generated)
    }

    pub fn render_detail(&self, post: &PostDetail) -> Result<String> {
        let config = &self.blog.config;
        let minutes = reading_time_with(post, config.words_per_minute);

        let view = PostView {
            uid: post.uid.clone(),
            title: post.title.clone(),
            author: post.author.clone(),
            banner: post.banner.url.clone(),
            date: self.display_date(post.first_publication_date.as_ref()),
            datetime: post
                .first_publication_date
                .as_ref()
                .map(date_xml)
                .unwrap_or_default(),
            reading_time: self.i18n.get_count("reading_time", minutes),
            sections: post
                .content
                .iter()
                .map(|block| SectionData {
                    heading: block.heading.clone(),
                    html: as_html(&block.body),
                })
                .collect(),
        };

        let mut context = self.create_base_context();
        context.insert("post", &view);

        self.renderer.render("post.html", &context)
    }

    pub fn generate_not_found(&self) -> Result<()> {
        let html = self
            .renderer
            .render("404.html", &self.create_base_context())?;
        self.write_output(Path::new("404.html"), &html)?;
        Ok(())
    }

    pub fn write_stylesheet(&self) -> Result<()> {
        self.write_output(Path::new("styles.css"), STYLESHEET)?;
        Ok(())
    }

    /// Copy everything under the static directory into the public directory
    pub fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.public_dir.join(relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::copy(path, &dest)?;
            tracing::debug!("Copied: {:?}", dest);
        }

        Ok(())
    }

    /// Write a file under the public directory unless it is unchanged
    ///
    /// Returns whether the file was written.
    pub fn write_output(&self, relative: &Path, content: &str) -> Result<bool> {
        let key = cache_key(relative);
        let hash = hash_content(content);
        let output_path = self.blog.public_dir.join(relative);

        if output_path.exists() && self.lock_cache().is_fresh(&key, hash) {
            tracing::debug!("Unchanged: {:?}", output_path);
            return Ok(false);
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, content)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        self.lock_cache().record(&key, hash);
        tracing::debug!("Generated: {:?}", output_path);

        Ok(true)
    }

    /// Delete a generated page and its now empty directory
    pub fn remove_output(&self, relative: &Path) -> Result<()> {
        let output_path = self.blog.public_dir.join(relative);
        if output_path.exists() {
            fs::remove_file(&output_path)?;
            tracing::info!("Deleted: {:?}", output_path);
            if let Some(parent) = output_path.parent() {
                // Only succeeds when empty
                let _ = fs::remove_dir(parent);
            }
        }
        self.lock_cache().forget(&cache_key(relative));
        Ok(())
    }

    pub fn save_cache(&self) -> Result<()> {
        self.lock_cache().save(&self.blog.base_dir)
    }

    fn create_base_context(&self) -> Context {
        let config = &self.blog.config;
        let site = SiteData {
            title: config.title.clone(),
            language: config.language.clone(),
            date_format: config.date_format.clone(),
            subtitle_length: config.subtitle_length,
        };

        let mut context = Context::new();
        context.insert("site", &site);
        context.insert("t", &self.i18n.get_all_translations());
        context
    }

    fn post_card(&self, post: &Post) -> PostCard {
        PostCard {
            uid: post.uid.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: self.display_date(post.first_publication_date.as_ref()),
            datetime: post
                .first_publication_date
                .as_ref()
                .map(date_xml)
                .unwrap_or_default(),
        }
    }

    fn display_date(&self, date: Option<&chrono::DateTime<chrono::Utc>>) -> String {
        let config = &self.blog.config;
        date.map(|d| format_date(d, &config.date_format, &config.language))
            .unwrap_or_default()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, RenderCache> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Cache keys use forward slashes on every platform
fn cache_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
