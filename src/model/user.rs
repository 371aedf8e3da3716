use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Read-only directory view of a user; ownership of this table lives with
/// the surrounding user-management system.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StaffUser {
    pub id: u64,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: String,
    pub role: String,
    pub shift_id: Option<u64>,
    pub branch_id: Option<u64>,
    pub geofence_enabled: bool,
    pub office_latitude: Option<f64>,
    pub office_longitude: Option<f64>,
    pub geo_radius: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Admin,
    Hr,
    Employee,
    MarketingExecutive,
}

impl StaffUser {
    pub fn role(&self) -> Option<StaffRole> {
        self.role.parse().ok()
    }

    /// Full name when present and non-empty, else the username, else the
    /// email address.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.username.as_deref().unwrap_or(&self.email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> StaffUser {
        StaffUser {
            id: 1,
            full_name: Some("Jamila Rahman".into()),
            username: Some("jamila".into()),
            email: "jamila@company.com".into(),
            role: "MARKETING_EXECUTIVE".into(),
            shift_id: None,
            branch_id: None,
            geofence_enabled: false,
            office_latitude: None,
            office_longitude: None,
            geo_radius: None,
        }
    }

    #[test]
    fn role_parses_screaming_snake_case() {
        assert_eq!(user().role(), Some(StaffRole::MarketingExecutive));

        let mut u = user();
        u.role = "INTERN".into();
        assert_eq!(u.role(), None);
    }

    #[test]
    fn display_name_falls_back_through_username_to_email() {
        assert_eq!(user().display_name(), "Jamila Rahman");

        let mut u = user();
        u.full_name = Some(String::new());
        assert_eq!(u.display_name(), "jamila");

        u.username = None;
        assert_eq!(u.display_name(), "jamila@company.com");
    }
}
