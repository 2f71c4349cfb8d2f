//! CMS host example
//!
//! Serves an article entity bound through `ModelAttribute`, a sitemap plugin
//! and an OAuth sign-in plugin.
//!
//! ```text
//! cargo run --example cms_host --features github
//! curl -X POST localhost:3000/plugins/sitemap/install
//! curl -X POST localhost:3000/plugins/sitemap/update \
//!      -d 'pluginId=sitemap&isEnabled=true&attributes[changefreq]=hourly'
//! curl localhost:3000/plugins/sitemap/setting
//! ```

use axum::extract::FromRef;
use plinth::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    pub id: Option<i64>,
    pub slug: String,
    pub title: String,
    pub published: bool,
}

impl_entity!(Article, i64, "article", [slug, title, published], unique = [slug]);
impl_entity_attribute!(Article, "article");

/// Publishes a sitemap of the site's articles
struct SitemapPlugin;

impl Plugin for SitemapPlugin {
    fn id(&self) -> &str {
        "sitemap"
    }

    fn name(&self) -> &str {
        "Sitemap"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn author(&self) -> &str {
        "plinth"
    }

    fn pre_update(&self, config: &mut PluginConfig) -> Vec<FieldValidationError> {
        const ALLOWED: [&str; 4] = ["always", "hourly", "daily", "weekly"];
        match config.get_attribute("changefreq") {
            Some(freq) if ALLOWED.contains(&freq) => Vec::new(),
            _ => vec![FieldValidationError::new(
                "attributes.changefreq",
                "must be one of always, hourly, daily, weekly",
            )],
        }
    }
}

#[derive(Clone)]
struct ArticleState {
    articles: EntityService<Article>,
    binder: Arc<AttributeBinder>,
}

impl FromRef<ArticleState> for Arc<AttributeBinder> {
    fn from_ref(state: &ArticleState) -> Self {
        state.binder.clone()
    }
}

async fn list_articles(
    State(state): State<ArticleState>,
) -> PlinthResult<axum::Json<Vec<Article>>> {
    Ok(axum::Json(state.articles.find_all_sorted(&Sort::asc("slug")).await?))
}

/// Creates with no `id`, updates with `id`
async fn save_article(
    State(state): State<ArticleState>,
    ModelAttribute(article): ModelAttribute<Article>,
) -> PlinthResult<axum::Json<Article>> {
    Ok(axum::Json(state.articles.save(article).await?))
}

async fn show_article(
    ModelAttribute(article): ModelAttribute<Article>,
) -> axum::Json<Article> {
    axum::Json(article)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,plinth=debug")),
        )
        .init();

    let path = std::env::var("PLINTH_CONFIG")
        .unwrap_or_else(|_| "demos/cms_host/plinth.yaml".to_string());
    let config = HostConfig::from_yaml_file(&path)?;
    let addr = config.bind.clone();

    let articles = EntityService::new(InMemoryEntityStore::<Article>::new());
    articles
        .save(Article {
            slug: "hello-world".to_string(),
            title: "Hello, world".to_string(),
            published: true,
            ..Default::default()
        })
        .await?;

    // The article routes need the binder, which the host builds
    let host = ServerBuilder::new()
        .with_config(config)
        .register_entity(articles.clone())
        .register_plugin(SitemapPlugin);

    #[cfg(feature = "github")]
    let host = host.register_plugin(
        OAuthPlugin::new("github", "GitHub", GithubProvider::new()).with_author("plinth"),
    );

    let host = Arc::new(host.build_host()?);

    let article_routes = Router::new()
        .route("/articles", get(list_articles).post(save_article))
        .route("/articles/{article}", get(show_article))
        .with_state(ArticleState {
            articles,
            binder: host.binder.clone(),
        });

    let app = build_router(host.clone(), vec![article_routes], false);

    println!("Plugins: {:?}", host.plugin_ids());
    println!("Entities: {:?}", host.resources());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
