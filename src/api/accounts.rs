//! Accounts and the session token
//!
//! Every endpoint here shares the single `Account` tag: logging in, logging
//! out or signing up all change what `get_token` returns.

use crate::cache::tags::Tag;
use crate::endpoint::{BodyRule, Method, MutationEndpoint, QueryEndpoint};
use serde::{Deserialize, Serialize};

pub const ACCOUNT: &str = "Account";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Session token with the account it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountToken {
    pub access_token: String,
    pub token_type: String,
    pub account: Account,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Sign-up form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountIn {
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Current session; `None` when logged out
pub fn get_token() -> QueryEndpoint<(), Option<AccountToken>> {
    QueryEndpoint::new("getToken", "/token").provides(vec![Tag::list(ACCOUNT)])
}

pub fn login() -> MutationEndpoint<Credentials, AccountToken> {
    MutationEndpoint::new("login", Method::Post, "/token")
        .body(BodyRule::Args)
        .invalidates(vec![Tag::list(ACCOUNT)])
}

pub fn logout() -> MutationEndpoint<(), bool> {
    MutationEndpoint::new("logout", Method::Delete, "/token").invalidates(vec![Tag::list(ACCOUNT)])
}

pub fn create_account() -> MutationEndpoint<AccountIn, AccountToken> {
    MutationEndpoint::new("createAccount", Method::Post, "/api/accounts")
        .body(BodyRule::Args)
        .invalidates(vec![Tag::list(ACCOUNT)])
}
