use serde::{Deserialize, Serialize};

/// Access level of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user filing tickets
    User,
    /// Support staff working the ticket queue
    Support,
}

impl Role {
    pub fn is_support(self) -> bool {
        matches!(self, Role::Support)
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Support => "Support",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserIdentity {
    /// Name plus login, e.g. "Anna Petrova (apetrova)"
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(username) if !username.is_empty() => format!("{} ({})", self.name, username),
            _ => self.name.clone(),
        }
    }
}
