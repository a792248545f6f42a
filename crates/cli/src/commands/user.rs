//! User management commands.
//!
//! The HTTP API never creates staff accounts, so the first staff user has
//! to come from here.

use storefront::config::database_url_from_env;
use storefront::db;
use storefront::services::auth::{Registration, register_user};

/// Create a user together with its customer profile.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the input fails
/// the same validation the registration endpoint applies.
pub async fn create(
    username: String,
    email: String,
    password: String,
    staff: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;

    let user = register_user(
        &pool,
        Registration {
            username: Some(username),
            password: Some(password),
            email: Some(email),
            is_staff: staff,
            ..Registration::default()
        },
    )
    .await?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        is_staff = user.is_staff,
        "User created"
    );
    Ok(())
}
