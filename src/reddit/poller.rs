//! Background Reddit monitor loop.
//!
//! Follows the same shape as the trends poller: startup delay, per-cycle
//! config read, log-and-sleep on failure.

use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

use super::{is_clickbait, is_scam_relevant, RedditClient, RedditError};

const STARTUP_DELAY_SECS: u64 = 30;
const DISABLED_RECHECK_SECS: u64 = 300;
const LISTING_LIMIT: u32 = 25;

pub async fn run_reddit_poller(state: Arc<AppState>) {
    tokio::time::sleep(Duration::from_secs(STARTUP_DELAY_SECS)).await;

    let mut client: Option<RedditClient> = None;

    loop {
        let config = state.config_snapshot().reddit;

        let (enabled, creds) = (
            config.enabled,
            config
                .client_id
                .clone()
                .zip(config.client_secret.clone()),
        );

        let Some((client_id, client_secret)) = creds.filter(|_| enabled) else {
            client = None;
            tokio::time::sleep(Duration::from_secs(DISABLED_RECHECK_SECS)).await;
            continue;
        };

        if client.is_none() {
            let mut fresh = RedditClient::new(&client_id, &client_secret, &config.user_agent);
            match fresh.authenticate().await {
                Ok(()) => client = Some(fresh),
                Err(e) => {
                    log::warn!("Reddit monitor: authentication failed: {}", e);
                }
            }
        }

        if let Some(ref mut c) = client {
            for subreddit in &config.subreddits {
                if let Err(e) = poll_subreddit(c, subreddit).await {
                    log::warn!("Reddit monitor: r/{}: {}", subreddit, e);
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(
            config.poll_interval_minutes as u64 * 60,
        ))
        .await;
    }
}

/// Fetch one subreddit and log what the monitor would reply to.
/// Re-authenticates once on 401 and gives up otherwise.
async fn poll_subreddit(client: &mut RedditClient, subreddit: &str) -> Result<(), RedditError> {
    let posts = match client.fetch_new_posts(subreddit, LISTING_LIMIT).await {
        Err(RedditError::Unauthorized) => {
            log::info!("Reddit monitor: token expired, re-authenticating");
            client.authenticate().await?;
            client.fetch_new_posts(subreddit, LISTING_LIMIT).await?
        }
        other => other?,
    };

    let mut flagged = 0;
    for post in &posts {
        if !is_scam_relevant(post) {
            continue;
        }
        if is_clickbait(&post.title) {
            log::info!(
                "Reddit monitor: skipping clickbait in r/{}: '{}'",
                subreddit,
                post.title
            );
            continue;
        }
        flagged += 1;
        // Posting is intentionally disabled; log the reply we would make.
        log::info!(
            "Reddit monitor: would reply to https://reddit.com{} ('{}' by u/{}) with reporting guidance",
            post.permalink,
            post.title,
            post.author
        );
    }

    if flagged > 0 {
        log::info!(
            "Reddit monitor: r/{}: {} of {} new posts scam-relevant",
            subreddit,
            flagged,
            posts.len()
        );
    }

    Ok(())
}
