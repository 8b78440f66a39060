use std::path::Path;

use keepsake::PlatformType;
use keepsake::media::MediaFetcher;
use keepsake::repository::account;
use keepsake::sync::SyncContext;

use crate::commands::shared::{Session, report_outcomes};
use crate::config::Config;

pub(crate) async fn handle_import(
    path: &Path,
    username: &str,
    config: &Config,
    database_url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("{} is not a directory", path.display()).into());
    }

    let session = Session::open(config, database_url).await?;
    let Some(owner) = account::find_by_username(&session.db, PlatformType::Twitter, username).await?
    else {
        return Err(format!(
            "no Twitter account named {username}; add it with `keepsake account add -p twitter -u {username}`"
        )
        .into());
    };

    let on_progress = session.reporter.as_callback();
    let mut ctx = SyncContext::new(&session.db, &session.engine).with_progress(&on_progress);
    if let Some(media) = &session.media {
        ctx = ctx.with_media(media as &dyn MediaFetcher);
    }

    tracing::info!(account = %owner.label(), path = %path.display(), "importing archive");
    let outcome = keepsake::twitter::import_archive(ctx, &owner, path).await;
    session.reporter.finish();

    Ok(report_outcomes(&[outcome?]))
}
