//! Session commands

use crate::error::Result;
use crate::services::SessionService;
use crate::state::AppState;

/// Sign out; the watchlist is cleared once the identity change propagates
pub async fn sign_out(state: &AppState) -> Result<()> {
    SessionService::sign_out(state).await
}

/// Current user id, if signed in
pub fn current_user(state: &AppState) -> Option<String> {
    state.user_id.borrow().clone()
}
