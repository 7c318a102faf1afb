//! Company settings persisted under `company_settings`, plus the invoice
//! numbering and tax rules that read them.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::drafts::DraftRecord;
use crate::error::StorageError;
use crate::store::{SharedStore, load_json, save_json};

pub const COMPANY_KEY: &str = "company_settings";

const DEFAULT_COMPANY_NAME: &str = "US AGRICOM";
const DEFAULT_LOGO: &str = "assets/images/usa-logo.png";
const DEFAULT_INVOICE_PREFIX: &str = "INV";
const INVOICE_NUMBER_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanySettings {
    pub name: String,
    /// Image path or data URL.
    pub logo: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    /// Percent, e.g. `7.5`.
    pub tax_rate: f64,
    pub invoice_prefix: String,
    pub invoice_start_number: u32,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_COMPANY_NAME.to_owned(),
            logo: DEFAULT_LOGO.to_owned(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            website: String::new(),
            tax_rate: 0.0,
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_owned(),
            invoice_start_number: 1,
        }
    }
}

impl CompanySettings {
    fn prefix(&self) -> &str {
        if self.invoice_prefix.is_empty() { DEFAULT_INVOICE_PREFIX } else { &self.invoice_prefix }
    }

    /// Next invoice number: `<prefix><n>` zero-padded to four digits, one past
    /// the highest number already used by a draft with the same prefix (and
    /// never below the configured start number).
    #[must_use]
    pub fn next_invoice_number(&self, drafts: &[DraftRecord]) -> String {
        let prefix = self.prefix();
        let start = u64::from(self.invoice_start_number.max(1));

        let highest = drafts
            .iter()
            .filter_map(|d| d.data.invoice_number.strip_prefix(prefix))
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .fold(start - 1, u64::max);

        format!("{prefix}{:0width$}", highest + 1, width = INVOICE_NUMBER_WIDTH)
    }

    /// Tax owed on `subtotal` at the configured rate.
    #[must_use]
    pub fn calculate_tax(&self, subtotal: f64) -> f64 {
        subtotal * self.tax_rate / 100.0
    }

    /// Lines for the company info block, skipping empty fields.
    #[must_use]
    pub fn contact_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.address.is_empty() {
            lines.push(self.address.clone());
        }
        if !self.phone.is_empty() {
            lines.push(format!("Phone: {}", self.phone));
        }
        if !self.email.is_empty() {
            lines.push(format!("Email: {}", self.email));
        }
        if !self.website.is_empty() {
            lines.push(format!("Website: {}", self.website));
        }
        lines
    }
}

#[derive(Clone)]
pub struct CompanyRepository {
    store: SharedStore,
}

impl CompanyRepository {
    /// Wrap `store`, writing default company settings if none exist yet.
    ///
    /// # Errors
    ///
    /// Fails when the defaults cannot be written.
    pub fn open(store: SharedStore) -> Result<Self, StorageError> {
        if store.get(COMPANY_KEY)?.is_none() {
            save_json(store.as_ref(), COMPANY_KEY, &CompanySettings::default())?;
        }
        Ok(Self { store })
    }

    /// # Errors
    ///
    /// Surfaces a corrupt settings record.
    pub fn get(&self) -> Result<CompanySettings, StorageError> {
        Ok(load_json(self.store.as_ref(), COMPANY_KEY)?.unwrap_or_default())
    }

    /// Apply `change` to the current settings and persist the result.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures.
    pub fn update(&self, change: impl FnOnce(&mut CompanySettings)) -> Result<CompanySettings, StorageError> {
        let mut settings = self.get()?;
        change(&mut settings);
        self.replace(&settings)?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Propagates backend write errors.
    pub fn replace(&self, settings: &CompanySettings) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), COMPANY_KEY, settings)
    }

    /// # Errors
    ///
    /// Propagates backend write errors.
    pub fn reset_to_defaults(&self) -> Result<CompanySettings, StorageError> {
        let defaults = CompanySettings::default();
        self.replace(&defaults)?;
        info!("company settings reset to defaults");
        Ok(defaults)
    }
}

#[cfg(test)]
#[path = "company_test.rs"]
mod tests;
