use crate::{
    auth::hash_password,
    config::AppConfig,
    error::AppResult,
    models::{NewUser, role::ROLE_ADMIN},
    repository::RepositoryState,
};

/// bootstrap_admin
///
/// Creates the configured administrator on an empty user table, so a fresh deployment has
/// someone who can reach `/admin`. Does nothing when no bootstrap credentials are
/// configured or when users already exist.
///
/// Returns whether an administrator was created.
pub async fn bootstrap_admin(repo: &RepositoryState, config: &AppConfig) -> AppResult<bool> {
    let Some(admin) = &config.admin else {
        return Ok(false);
    };
    if repo.count_users().await? > 0 {
        tracing::debug!("users exist, skipping admin bootstrap");
        return Ok(false);
    }

    let password_hash = hash_password(admin.password.clone(), config.bcrypt_cost).await?;
    let user = repo
        .create_user(NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            ..Default::default()
        })
        .await?;
    let role = repo.get_role_by_name(ROLE_ADMIN).await?;
    repo.assign_role(user.id, role.id).await?;

    tracing::info!("bootstrapped administrator {} ({})", user.username, user.id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AdminBootstrap, repository::InMemoryRepository};
    use std::sync::Arc;

    fn config_with_admin() -> AppConfig {
        AppConfig {
            admin: Some(AdminBootstrap {
                username: "root".to_string(),
                email: "root@example.org".to_string(),
                password: "changeme".to_string(),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_admin_on_empty_store_only_once() {
        let repo: RepositoryState = Arc::new(InMemoryRepository::new());
        let config = config_with_admin();

        assert!(bootstrap_admin(&repo, &config).await.unwrap());
        assert!(!bootstrap_admin(&repo, &config).await.unwrap());

        let users = repo.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].has_role(ROLE_ADMIN));
        assert!(users[0].has_role("ROLE_USER"));
    }

    #[tokio::test]
    async fn skipped_without_credentials() {
        let repo: RepositoryState = Arc::new(InMemoryRepository::new());
        assert!(!bootstrap_admin(&repo, &AppConfig::default()).await.unwrap());
        assert_eq!(repo.count_users().await.unwrap(), 0);
    }
}
