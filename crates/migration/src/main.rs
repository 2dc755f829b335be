//! Standalone migration runner: `cargo run -p migration -- <command> [db-url]`.

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DB_URL: &str = "sqlite:./ledgerbook.db?mode=rwc";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Up,
    Down,
    Fresh,
    Status,
}

impl Command {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg {
            None | Some("up") => Some(Self::Up),
            Some("down") => Some(Self::Down),
            Some("fresh") => Some(Self::Fresh),
            Some("status") => Some(Self::Status),
            Some(_) => None,
        }
    }

    async fn run(self, db: &sea_orm::DatabaseConnection) -> Result<(), DbErr> {
        match self {
            Self::Up => migration::Migrator::up(db, None).await,
            Self::Down => migration::Migrator::down(db, None).await,
            Self::Fresh => migration::Migrator::fresh(db).await,
            Self::Status => migration::Migrator::status(db).await,
        }
    }
}

/// Explicit positional argument wins over `DATABASE_URL`.
fn database_url(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DB_URL.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd_arg = args.next();

    let Some(cmd) = Command::parse(cmd_arg.as_deref()) else {
        eprintln!("Usage: cargo run -p migration -- [up|down|fresh|status] [db-url]");
        std::process::exit(2);
    };

    let db = Database::connect(database_url(args.next())).await?;
    cmd.run(&db).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_defaults_to_up() {
        assert_eq!(Command::parse(None), Some(Command::Up));
    }

    #[test]
    fn known_commands_parse() {
        assert_eq!(Command::parse(Some("up")), Some(Command::Up));
        assert_eq!(Command::parse(Some("down")), Some(Command::Down));
        assert_eq!(Command::parse(Some("fresh")), Some(Command::Fresh));
        assert_eq!(Command::parse(Some("status")), Some(Command::Status));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(Command::parse(Some("sideways")), None);
    }

    #[test]
    fn explicit_url_wins() {
        assert_eq!(
            database_url(Some("sqlite::memory:".to_string())),
            "sqlite::memory:"
        );
    }
}
