//! Identity of the caller as carried by the auth hub's bearer token.

use serde::{Deserialize, Serialize};

/// Claims of an authenticated user. `hub_id` is the caller's team.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub sub: String,
    pub email: String,
    pub hub_id: i32,
    pub name: String,
    pub roles: Vec<String>,
    pub exp: usize,
}
