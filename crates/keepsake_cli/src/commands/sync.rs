use keepsake::media::MediaFetcher;
use keepsake::sync::{
    AccountSelection, HttpBindingFactory, SyncContext, SyncOutcome, sync_account_identity,
    sync_favorites, sync_recent,
};

use crate::commands::shared::{Session, report_outcomes};
use crate::config::Config;
use crate::{AccountArgs, FeedArgs};

fn selection(args: &AccountArgs) -> AccountSelection {
    match &args.account {
        Some(username) => AccountSelection::named(args.platform, username.clone()),
        None => AccountSelection::all(args.platform),
    }
}

#[derive(Clone, Copy)]
enum Operation {
    Recent,
    Favorites,
    AccountIdentity,
}

async fn run_sync(
    operation: Operation,
    args: &AccountArgs,
    mode: Option<keepsake::sync::FetchMode>,
    config: &Config,
    database_url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let session = Session::open(config, database_url).await?;
    let factory = HttpBindingFactory::new(session.transport.clone(), &session.engine);
    let on_progress = session.reporter.as_callback();

    let mut ctx = SyncContext::new(&session.db, &session.engine).with_progress(&on_progress);
    if let Some(media) = &session.media {
        ctx = ctx.with_media(media as &dyn MediaFetcher);
    }

    let selection = selection(args);
    let mode = mode.unwrap_or(keepsake::sync::FetchMode::New);
    let result: Result<Vec<SyncOutcome>, _> = match operation {
        Operation::Recent => sync_recent(ctx, &factory, &selection, mode).await,
        Operation::Favorites => sync_favorites(ctx, &factory, &selection, mode).await,
        Operation::AccountIdentity => sync_account_identity(ctx, &factory, &selection).await,
    };
    session.reporter.finish();

    Ok(report_outcomes(&result?))
}

pub(crate) async fn handle_recent(
    args: FeedArgs,
    config: &Config,
    database_url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    run_sync(
        Operation::Recent,
        &args.accounts,
        Some(args.count),
        config,
        database_url,
    )
    .await
}

pub(crate) async fn handle_favorites(
    args: FeedArgs,
    config: &Config,
    database_url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    run_sync(
        Operation::Favorites,
        &args.accounts,
        Some(args.count),
        config,
        database_url,
    )
    .await
}

pub(crate) async fn handle_account_identity(
    args: AccountArgs,
    config: &Config,
    database_url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    run_sync(
        Operation::AccountIdentity,
        &args,
        None,
        config,
        database_url,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake::PlatformType;

    #[test]
    fn selection_from_args() {
        let all = selection(&AccountArgs {
            platform: PlatformType::Flickr,
            account: None,
        });
        assert_eq!(all, AccountSelection::all(PlatformType::Flickr));

        let one = selection(&AccountArgs {
            platform: PlatformType::Twitter,
            account: Some("alice".to_string()),
        });
        assert_eq!(one, AccountSelection::named(PlatformType::Twitter, "alice"));
    }
}
