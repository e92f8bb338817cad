//! Fixture users served by the mock responders.

use chrono::{TimeZone, Utc};

use crate::types::{Role, User};

fn user(id: &str, username: &str, name: &str, role: Role, github: &str, joined: (i32, u32, u32)) -> User {
    let (y, m, d) = joined;
    User {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{username}@aswtech.com"),
        name: name.to_string(),
        avatar: Some(format!(
            "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
            username.split('.').next().unwrap_or(username)
        )),
        role,
        github_username: Some(github.to_string()),
        created_at: Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).single(),
        last_login: None,
    }
}

pub fn mock_users() -> Vec<User> {
    vec![
        user("usr-sarah", "sarah.chen", "Sarah Chen", Role::Admin, "sarahchen", (2024, 3, 4)),
        user("usr-james", "james.wilson", "James Wilson", Role::Developer, "jwilson", (2024, 6, 10)),
        user("usr-maria", "maria.garcia", "Maria Garcia", Role::Developer, "mgarcia", (2024, 9, 2)),
        user("usr-michael", "michael.brown", "Michael Brown", Role::Viewer, "mbrown", (2025, 1, 20)),
    ]
}

/// The user a mock login falls back to when no fixture matches.
pub fn default_user() -> User {
    user("usr-sarah", "sarah.chen", "Sarah Chen", Role::Admin, "sarahchen", (2024, 3, 4))
}
