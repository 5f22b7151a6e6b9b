//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! showcase user create -e admin@example.com -p 'correct horse battery' -n "Admin" -r admin
//! ```

use showcase_core::UserRole;
use showcase_server::services::{AuthError, AuthService};

use super::{CommandError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: user, admin")]
    InvalidRole(String),

    /// Email, password or uniqueness check failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a password account with the given role.
///
/// # Errors
///
/// Returns an error for an unknown role, an invalid email or password, an
/// email that is already registered, or a database failure.
pub async fn create(
    email: &str,
    password: &str,
    name: Option<&str>,
    role: &str,
) -> Result<(), UserError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let pool = connect().await?;

    tracing::info!("Creating user: {} ({})", email, role);
    let user = AuthService::new(&pool)
        .create_user(email, password, name, role)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
