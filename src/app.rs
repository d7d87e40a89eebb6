use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail, ensure};
use chrono::{FixedOffset, Utc};
use log::{debug, error, info, warn};
use tokio::time::MissedTickBehavior;

use crate::columnist::{Columnist, fallback_column};
use crate::config::{Config, EnsureOutcome};
use crate::image::ImageValidator;
use crate::logger::init_logger;
use crate::models::{Post, PostData, Sport};
use crate::pipeline::Pipeline;
use crate::publisher::Publisher;
use crate::sources::{FeedReader, GuardianSearch};

pub struct RunOptions {
    pub sports: Vec<Sport>,
    pub interval_ms: Option<u64>,
    pub config_path: Option<PathBuf>,
    pub no_ai: bool,
    pub no_publish: bool,
    pub verbose: bool,
}

/// Everything one cycle needs, built once at startup.
struct Bot {
    pipeline: Pipeline,
    columnist: Option<Columnist>,
    publisher: Option<Publisher>,
    forced_sports: Vec<Sport>,
    sport_attempts: usize,
    timezone: FixedOffset,
}

pub async fn run(opts: RunOptions) -> Result<()> {
    // 0) Logger
    init_logger(opts.verbose)?;

    // 1) Config
    let config_outcome: EnsureOutcome = Config::ensure_user_config(opts.config_path.as_deref())?;
    if config_outcome.created {
        warn!(
            "Config file created at {}. Please edit it and restart the app.",
            config_outcome.path.display()
        );
        return Ok(());
    }
    let cfg = Config::load(&config_outcome.path)?;
    debug!("User config loaded from {}", config_outcome.path.display());

    // 2) Collaborators
    let publisher = if opts.no_publish {
        info!("--no-publish flag set, posts will only be logged");
        None
    } else {
        let publisher = Publisher::from_config(&cfg)?;
        ensure!(
            publisher.has_credentials(),
            "No publish target configured. Set discord_webhook_url, discord_bot_token + discord_channel_id, \
             or telegram_bot_token + telegram_chat_ids, or run with --no-publish."
        );
        Some(publisher)
    };

    let columnist = if opts.no_ai {
        info!("--no-ai flag set, using story summaries as post bodies");
        None
    } else {
        Some(Columnist::new(
            &cfg.openai_api_key,
            &cfg.model,
            Duration::from_secs(cfg.ai_timeout_secs),
        ))
    };

    let bot = Bot {
        pipeline: build_pipeline(&cfg)?,
        columnist,
        publisher,
        forced_sports: opts.sports,
        sport_attempts: cfg.sport_attempts,
        timezone: cfg.timezone()?,
    };

    debug!("{} sports in the catalog", bot.pipeline.catalog().profiles().len());

    // 3) Run once, or forever on a fixed interval
    let Some(interval_ms) = opts.interval_ms else {
        return bot.run_cycle().await;
    };
    ensure!(interval_ms > 0, "--interval must be greater than 0");

    info!("Running every {interval_ms} ms");
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = bot.run_cycle().await {
                    error!("Cycle failed: {e:#}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                return Ok(());
            }
        }
    }
}

fn build_pipeline(cfg: &Config) -> Result<Pipeline> {
    let http_timeout = Duration::from_secs(cfg.http_timeout_secs);

    if cfg.guardian_api_key.is_none() {
        warn!("No guardian_api_key configured, stories will come from RSS feeds only");
    }
    let primary = GuardianSearch::new(
        http_timeout,
        cfg.guardian_endpoint.clone(),
        cfg.guardian_api_key.clone(),
        cfg.search_page_size,
    )?
    .with_section(cfg.guardian_section.clone())
    .with_region_terms(cfg.region_terms.clone());

    let fallback = FeedReader::new(http_timeout)?;
    let images = ImageValidator::new(
        http_timeout,
        cfg.max_redirects,
        cfg.blocked_image_hosts.clone(),
    )?;

    Ok(Pipeline::new(
        cfg.catalog(),
        Box::new(primary),
        Box::new(fallback),
        images,
        cfg.window_days,
    ))
}

impl Bot {
    fn sports_for_cycle(&self) -> Vec<Sport> {
        if !self.forced_sports.is_empty() {
            return self.forced_sports.clone();
        }
        let mut rng = rand::rng();
        self.pipeline
            .catalog()
            .weighted_order(&mut rng, self.sport_attempts)
    }

    async fn run_cycle(&self) -> Result<()> {
        let sports = self.sports_for_cycle();
        if sports.is_empty() {
            bail!("No sport in the catalog has a positive weight");
        }
        debug!("Trying sports in order: {sports:?}");

        let now = Utc::now().with_timezone(&self.timezone);
        let post = match self.pipeline.first_postable(&sports, now).await? {
            PostData::Post(post) => post,
            PostData::Skip { sport, reason } => {
                info!("[SKIP] {sport}: {reason}");
                return Ok(());
            }
        };
        info!("Picked {} story: {} ({})", post.sport, post.title, post.url);

        let body = self.body_for(&post).await?;

        match &self.publisher {
            Some(publisher) => {
                let delivery = publisher.publish(&post, &body).await?;
                info!("[POSTED via {delivery}] {} | {}", post.caption, post.url);
            }
            None => info!(
                "[DRY RUN] {}\n{}\n\n{}\nimage: {}",
                post.caption,
                body,
                post.hashtag_line(),
                post.image.as_str()
            ),
        }
        Ok(())
    }

    async fn body_for(&self, post: &Post) -> Result<String> {
        match &self.columnist {
            Some(columnist) => columnist.write_column(post).await,
            None => Ok(fallback_column(post)),
        }
    }
}
