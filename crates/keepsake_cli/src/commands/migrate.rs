use console::style;
use keepsake::db;
use keepsake::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            println!("Applying {pending} migration(s)...");
            Migrator::up(&db, None).await?;
            println!("{} Migrations applied.", style("✓").green().bold());
        }
        MigrateAction::Down => {
            println!("Rolling back last migration...");
            Migrator::down(&db, Some(1)).await?;
            println!("{} Rollback complete.", style("✓").green().bold());
        }
        MigrateAction::Status => {
            for migration in Migrator::get_migration_with_status(&db).await? {
                println!("{:<10} {}", migration.status().to_string(), migration.name());
            }
        }
        MigrateAction::Fresh => {
            println!("Dropping the archive schema and reapplying migrations...");
            Migrator::fresh(&db).await?;
            println!("{} Fresh migration complete.", style("✓").green().bold());
        }
    }

    Ok(())
}
