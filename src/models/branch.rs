// src/models/branch.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Upper-case short code such as "CSE" or "ECE2".
static BRANCH_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]{1,9}$").expect("branch code pattern is valid"));

/// Represents the 'branches' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Body for both create and update; every field is required.
#[derive(Debug, Deserialize, Validate)]
pub struct BranchRequest {
    #[validate(length(min = 1, max = 100, message = "Branch name is required"))]
    pub name: String,
    #[validate(regex(path = *BRANCH_CODE, message = "Code must be 2-10 upper-case letters or digits"))]
    pub code: String,
}
