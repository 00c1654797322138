use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub province: String,
    pub district: String,
    pub ward: String,
    pub street: String,
}

impl Address {
    /// Replace each part that `update` provides as a non-empty string
    pub fn merge(&self, update: &AddressUpdate) -> Address {
        fn pick(new: &Option<String>, old: &str) -> String {
            match new {
                Some(v) if !v.is_empty() => v.clone(),
                _ => old.to_string(),
            }
        }
        Address {
            province: pick(&update.province, &self.province),
            district: pick(&update.district, &self.district),
            ward: pick(&update.ward, &self.ward),
            street: pick(&update.street, &self.street),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressUpdate {
    pub province: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub street: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub phone: String,
    pub address: Json<Address>,
    pub is_admin: bool,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub wishlist: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_parts_that_are_missing_or_empty() {
        let current = Address {
            province: "Hồ Chí Minh".into(),
            district: "Quận 6".into(),
            ward: "Phường 1".into(),
            street: "654 Phạm Văn Chí".into(),
        };
        let update = AddressUpdate {
            province: None,
            district: Some(String::new()),
            ward: Some("Phường 2".into()),
            street: None,
        };
        let merged = current.merge(&update);
        assert_eq!(merged.province, "Hồ Chí Minh");
        assert_eq!(merged.district, "Quận 6");
        assert_eq!(merged.ward, "Phường 2");
        assert_eq!(merged.street, "654 Phạm Văn Chí");
    }

    #[test]
    fn password_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: "Admin".into(),
            email: "admin@daliyuan.com.vn".into(),
            password: "$2b$10$hash".into(),
            phone: String::new(),
            address: Json(Address::default()),
            is_admin: true,
            google_id: None,
            avatar: None,
            wishlist: vec![],
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["fullName"], "Admin");
        assert_eq!(value["isAdmin"], true);
        assert!(value.get("_id").is_some());
    }
}
