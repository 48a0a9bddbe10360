use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config;
use crate::data::{
    DetailService, OmdbDetailService, OmdbSearchService, ScriptedDetailService,
    ScriptedSearchService, SearchService,
};
use crate::details::DetailCache;
use crate::logging;
use crate::omdb;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    /// Serve a built-in catalog instead of talking to OMDb.
    pub demo: bool,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let (search_service, detail_service, status) = if opts.demo {
        let search: Arc<dyn SearchService> = Arc::new(ScriptedSearchService::demo());
        let details: Arc<dyn DetailService> = Arc::new(ScriptedDetailService::demo());
        (
            search,
            details,
            "Demo catalog loaded. No network access.".to_string(),
        )
    } else {
        let api_key = cfg.require_api_key()?.to_string();
        let base_url = cfg.base_url()?;
        let client = omdb::Client::new(omdb::ClientConfig {
            api_key,
            base_url: base_url.to_string(),
            timeout: cfg.omdb.timeout,
            ..omdb::ClientConfig::default()
        })
        .context("create omdb client")?;
        let client = Arc::new(client);
        let search: Arc<dyn SearchService> = Arc::new(OmdbSearchService::new(client.clone()));
        let details: Arc<dyn DetailService> = Arc::new(OmdbDetailService::new(client));
        (search, details, format!("Connected to {}", base_url))
    };

    if let Err(err) = logging::init(&cfg.log) {
        eprintln!("warning: logging disabled: {err:#}");
    }
    if opts.demo {
        info!("running against the demo catalog");
    }

    let detail_cache = Arc::new(DetailCache::new(detail_service));
    let mut model = ui::Model::new(ui::Options {
        status_message: status,
        search_service,
        detail_cache,
        default_topic: cfg.search.default_topic.clone(),
        debounce: cfg.search.debounce,
    });
    let result = model.run();
    if let Err(err) = &result {
        warn!(error = %err, "terminal session ended with an error");
    }
    result
}
