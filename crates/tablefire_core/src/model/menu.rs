//! Menu items.

use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MenuItemId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    /// Unique display name.
    pub name: String,
    pub category: String,
    /// Price in minor units (paise).
    pub price_minor: i64,
    pub description: Option<String>,
    /// Unavailable items stay on the menu but cannot be ordered.
    pub is_available: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, category: impl Into<String>, price_minor: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            category: category.into().trim().to_string(),
            price_minor,
            description: None,
            is_available: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("category", &self.category)?;
        if self.price_minor < 0 {
            return Err(ValidationError::NegativeAmount(self.price_minor));
        }
        Ok(())
    }
}
