use anyhow::Context;

use userdesk_infra::bootstrap;
use userdesk_infra::mail::mailer_from_config;
use userdesk_infra::{AccountServices, AppConfig};

/// Wire repository, mailer and services from configuration, seeding the
/// bootstrap admin when one is configured.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AccountServices> {
    if config.uses_dev_secret() {
        tracing::warn!("tokens are signed with the insecure dev secret");
    }

    let repo = bootstrap::account_repository(config).await?;
    if let Some(admin) = &config.bootstrap_admin {
        bootstrap::seed_admin(repo.as_ref(), admin)
            .await
            .context("failed to seed bootstrap admin")?;
    }

    let mailer = mailer_from_config(config).context("failed to build mailer")?;
    Ok(AccountServices::new(config, repo, mailer))
}
