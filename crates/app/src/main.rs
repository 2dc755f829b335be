use std::collections::HashMap;
use std::str::FromStr;

use migration::{Migrator, MigratorTrait};
use server::{AdminList, AuthGate, Identity, IdentityProvider};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledgerbook={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let default_tz = chrono_tz::Tz::from_str(&settings.time.default_input_timezone)
        .map_err(|_| format!("unknown timezone: {}", settings.time.default_input_timezone))?;

    let provider = match settings.auth.provider {
        settings::Provider::Userinfo { url } => IdentityProvider::http(url),
        settings::Provider::Static { tokens } => {
            let tokens: HashMap<String, Identity> = tokens
                .into_iter()
                .map(|t| {
                    (
                        t.token,
                        Identity {
                            id: t.user_id,
                            email: t.email,
                        },
                    )
                })
                .collect();
            IdentityProvider::fixed(tokens)
        }
    };
    let auth_gate = AuthGate {
        provider,
        admins: AdminList::new(settings.auth.admin_emails),
    };

    tracing::info!("initializing database...");
    let db = match parse_database(&settings.server.database).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!("failed to initialize database: {err}");
            return Err(err);
        }
    };

    let engine = engine::Engine::builder().database(db).build().await?;

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return Err(err.into());
        }
    };
    if let Err(err) = server::run_with_listener(engine, auth_gate, default_tz, listener).await {
        tracing::error!("server failed: {err}");
        return Err(err.into());
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite { path } => format!("sqlite:{path}?mode=rwc"),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
