//! # Auth Commands

use serde::{Deserialize, Serialize};
use storefront_core::{Role, Session, User};
use tracing::info;

use super::CommandResult;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Account details safe to hand to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        AccountResponse {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

/// Creates a customer account. Does not log in.
pub async fn register(state: &AppState, request: RegisterRequest) -> CommandResult<AccountResponse> {
    let user = state
        .db
        .auth()
        .register(&request.email, &request.password, &request.full_name)
        .await?;
    Ok(user.into())
}

/// Checks credentials and hands back the session the caller keeps.
pub async fn login(state: &AppState, email: &str, password: &str) -> CommandResult<Session> {
    Ok(state.db.auth().login(email, password).await?)
}

/// Ends a session. Nothing is stored, so this only consumes it.
pub fn logout(session: Session) {
    info!(user_id = session.user_id, session = %session.id, "Logged out");
}
