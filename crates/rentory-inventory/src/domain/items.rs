use crate::domain::types::{ItemId, Money, UserId};
use crate::error::{InventoryError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Item {
    pub id: ItemId,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Units owned, i.e. the stock ceiling for any single day
    pub quantity: i32,
    pub daily_rate: Money,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: i32,
    pub daily_rate: Decimal,
    pub image_url: Option<String>,
}

/// Partial update; absent fields are left untouched and empty strings clear optional text
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
    pub daily_rate: Option<Decimal>,
    pub image_url: Option<String>,
}

/// Filters for listing items
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(category) = &self.category {
            if item.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = item.name.to_lowercase().contains(&needle);
            let in_description = item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}

impl Item {
    pub fn create(user_id: UserId, new: NewItem) -> Result<Self> {
        validate_name(&new.name)?;
        validate_quantity(new.quantity)?;
        validate_rate(new.daily_rate)?;
        let image_url = normalize_text(new.image_url);
        if let Some(url) = &image_url {
            validate_image_url(url)?;
        }

        let now = Utc::now();
        Ok(Self {
            id: ItemId::new(),
            user_id,
            name: new.name.trim().to_string(),
            description: normalize_text(new.description),
            category: normalize_text(new.category),
            quantity: new.quantity,
            daily_rate: Money::from_decimal(new.daily_rate),
            image_url,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, update: ItemUpdate) -> Result<()> {
        if let Some(name) = update.name {
            validate_name(&name)?;
            self.name = name.trim().to_string();
        }
        if let Some(quantity) = update.quantity {
            validate_quantity(quantity)?;
            self.quantity = quantity;
        }
        if let Some(rate) = update.daily_rate {
            validate_rate(rate)?;
            self.daily_rate = Money::from_decimal(rate);
        }
        if let Some(description) = update.description {
            self.description = normalize_text(Some(description));
        }
        if let Some(category) = update.category {
            self.category = normalize_text(Some(category));
        }
        if let Some(url) = update.image_url {
            let url = normalize_text(Some(url));
            if let Some(u) = &url {
                validate_image_url(u)?;
            }
            self.image_url = url;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::validation("name", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(InventoryError::validation(
            "name",
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(InventoryError::validation("quantity", "must be at least 1"));
    }
    Ok(())
}

fn validate_rate(rate: Decimal) -> Result<()> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(InventoryError::validation(
            "daily_rate",
            "must not be negative",
        ));
    }
    Money::bounded("daily_rate", rate)?;
    Ok(())
}

fn validate_image_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(InventoryError::validation(
            "image_url",
            "must be an http(s) URL",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_item() -> NewItem {
        NewItem {
            name: "  Folding chair ".to_string(),
            description: Some("White resin".to_string()),
            category: Some("furniture".to_string()),
            quantity: 40,
            daily_rate: dec!(2.5),
            image_url: None,
        }
    }

    #[test]
    fn test_create_trims_and_normalizes() {
        let item = Item::create(UserId::new("owner"), new_item()).unwrap();
        assert_eq!(item.name, "Folding chair");
        assert_eq!(item.daily_rate.to_string(), "2.50");
        assert_eq!(item.quantity, 40);
    }

    #[test]
    fn test_create_rejects_invalid_fields() {
        let mut bad = new_item();
        bad.name = "   ".to_string();
        assert!(Item::create(UserId::new("owner"), bad).is_err());

        let mut bad = new_item();
        bad.quantity = 0;
        assert!(Item::create(UserId::new("owner"), bad).is_err());

        let mut bad = new_item();
        bad.daily_rate = dec!(-1);
        assert!(Item::create(UserId::new("owner"), bad).is_err());

        let mut bad = new_item();
        bad.daily_rate = Decimal::MAX / dec!(2);
        assert!(matches!(
            Item::create(UserId::new("owner"), bad),
            Err(InventoryError::Validation { field, .. }) if field == "daily_rate"
        ));

        let mut bad = new_item();
        bad.image_url = Some("ftp://images/chair.png".to_string());
        assert!(Item::create(UserId::new("owner"), bad).is_err());
    }

    #[test]
    fn test_apply_clears_optional_text() {
        let mut item = Item::create(UserId::new("owner"), new_item()).unwrap();
        item.apply(ItemUpdate {
            description: Some(String::new()),
            quantity: Some(12),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(item.description, None);
        assert_eq!(item.quantity, 12);
        assert_eq!(item.category.as_deref(), Some("furniture"));
    }

    #[test]
    fn test_filter_matches_category_and_search() {
        let item = Item::create(UserId::new("owner"), new_item()).unwrap();

        let by_category = ItemFilter {
            category: Some("furniture".to_string()),
            search: None,
        };
        assert!(by_category.matches(&item));

        let by_search = ItemFilter {
            category: None,
            search: Some("resin".to_string()),
        };
        assert!(by_search.matches(&item));

        let miss = ItemFilter {
            category: Some("lighting".to_string()),
            search: None,
        };
        assert!(!miss.matches(&item));
    }
}
