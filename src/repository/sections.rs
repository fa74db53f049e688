//! Section catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult};
use crate::identity::TokenIssuer;
use crate::model::{now_unix, Section, SettingsValue};
use crate::store::SectionStore;

/// Sections that exist from the moment the repository is built and can
/// never be deleted: `(name, friendly name)`.
pub const WELL_KNOWN_SECTIONS: &[(&str, &str)] = &[
    ("global", "Global"),
    ("common", "Common"),
    ("client", "Game Client"),
    ("server", "Game Server"),
];

pub fn is_well_known(name: &str) -> bool {
    WELL_KNOWN_SECTIONS.iter().any(|(n, _)| *n == name)
}

/// Owns the catalog of sections and their admin tokens.
pub struct SectionRepository {
    store: Arc<dyn SectionStore>,
    issuer: Arc<dyn TokenIssuer>,
}

impl SectionRepository {
    /// Build the repository and bootstrap the well-known sections.
    pub async fn new(store: Arc<dyn SectionStore>, issuer: Arc<dyn TokenIssuer>) -> ConfigResult<Self> {
        let repository = Self { store, issuer };
        for (name, friendly_name) in WELL_KNOWN_SECTIONS {
            repository.ensure_exists(name, friendly_name).await?;
        }
        Ok(repository)
    }

    pub fn store(&self) -> &Arc<dyn SectionStore> {
        &self.store
    }

    /// Create an empty section. Fails with `DuplicateName` if the name is taken.
    pub async fn create(&self, name: &str, friendly_name: &str) -> ConfigResult<Section> {
        require_name(name)?;
        let section = self.store.insert(Section::new(name, friendly_name, now_unix())).await?;
        tracing::info!(section = %name, "Section created");
        Ok(section)
    }

    /// Insert a fully formed section (imports). Fails with `DuplicateName`.
    pub async fn insert(&self, section: Section) -> ConfigResult<Section> {
        require_name(&section.name)?;
        Ok(self.store.insert(section).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> ConfigResult<Section> {
        self.store
            .find_by_name(name)
            .await?
            .ok_or_else(|| ConfigError::section_missing(name))
    }

    pub async fn exists(&self, name: &str) -> ConfigResult<bool> {
        Ok(self.store.find_by_name(name).await?.is_some())
    }

    /// All sections without subscriber lists.
    pub async fn list(&self) -> ConfigResult<Vec<Section>> {
        Ok(self.store.list_projected().await?)
    }

    /// All sections including subscribers; for ledger maintenance.
    pub async fn list_full(&self) -> ConfigResult<Vec<Section>> {
        Ok(self.store.list().await?)
    }

    /// Create the section if absent. An existing section keeps its friendly
    /// name and data.
    pub async fn ensure_exists(&self, name: &str, friendly_name: &str) -> ConfigResult<Section> {
        require_name(name)?;
        Ok(self.store.upsert_by_name(name, friendly_name, now_unix()).await?)
    }

    /// Persist a whole document.
    pub async fn update(&self, section: &Section) -> ConfigResult<()> {
        if !self.store.replace(section).await? {
            return Err(ConfigError::section_missing(&section.name));
        }
        Ok(())
    }

    /// Write `values` into the keys that are missing or empty. Returns the
    /// keys written.
    pub async fn fill_values(
        &self,
        name: &str,
        values: BTreeMap<String, SettingsValue>,
        now: u64,
    ) -> ConfigResult<Vec<String>> {
        self.store
            .fill_values(name, values, now)
            .await?
            .ok_or_else(|| ConfigError::section_missing(name))
    }

    pub async fn delete(&self, name: &str) -> ConfigResult<bool> {
        if is_well_known(name) {
            return Err(ConfigError::Protected(name.to_string()));
        }
        Ok(self.store.delete_by_name(name).await?)
    }

    /// Return the section's admin token, minting one on first use.
    ///
    /// Concurrent callers may each mint a token; the first one persisted is
    /// kept and returned to everyone.
    pub async fn generate_admin_token(&self, name: &str) -> ConfigResult<String> {
        let section = self.find_by_name(name).await?;
        if let Some(token) = section.admin_token {
            return Ok(token);
        }

        let minted = self.issuer.mint(name).await?;
        let persisted = self
            .store
            .set_admin_token_if_absent(name, &minted)
            .await?
            .ok_or_else(|| ConfigError::section_missing(name))?;

        if persisted != minted {
            tracing::debug!(section = %name, "Admin token raced; keeping the persisted one");
        }
        Ok(persisted)
    }
}

fn require_name(name: &str) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidRequest("section name must not be blank".into()));
    }
    Ok(())
}
