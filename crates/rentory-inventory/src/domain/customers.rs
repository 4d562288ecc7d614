use crate::domain::items::normalize_text;
use crate::domain::types::{CustomerId, UserId};
use crate::error::{InventoryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Customer {
    pub id: CustomerId,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl Customer {
    pub fn create(user_id: UserId, new: NewCustomer) -> Result<Self> {
        let name = validate_name(&new.name)?;
        let email = normalize_text(new.email);
        if let Some(e) = &email {
            validate_email(e)?;
        }

        let now = Utc::now();
        Ok(Self {
            id: CustomerId::new(),
            user_id,
            name,
            email,
            phone: normalize_text(new.phone),
            address: normalize_text(new.address),
            notes: normalize_text(new.notes),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, update: CustomerUpdate) -> Result<()> {
        if let Some(name) = update.name {
            self.name = validate_name(&name)?;
        }
        if let Some(email) = update.email {
            let email = normalize_text(Some(email));
            if let Some(e) = &email {
                validate_email(e)?;
            }
            self.email = email;
        }
        if let Some(phone) = update.phone {
            self.phone = normalize_text(Some(phone));
        }
        if let Some(address) = update.address {
            self.address = normalize_text(Some(address));
        }
        if let Some(notes) = update.notes {
            self.notes = normalize_text(Some(notes));
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Case-insensitive match on name, email or phone
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [Some(self.name.as_str()), self.email.as_deref(), self.phone.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::validation("name", "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(InventoryError::validation(
            "email",
            "must be a valid email address",
        )),
    }
}
