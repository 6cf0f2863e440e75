//! RPC method names and protocol constants

/// Login call: params `[username, {"password": ..}, language]`
pub const LOGIN: &str = "common.db.login";

pub const LOGOUT: &str = "common.db.logout";

pub const MENU_MODEL: &str = "ir.ui.menu";

pub const WINDOW_ACTION_MODEL: &str = "ir.action.act_window";

/// Keyword lookup used to find what a menu entry opens
pub const GET_KEYWORD: &str = "model.ir.action.keyword.get_keyword";

pub const MENU_KEYWORD: &str = "tree_open";

/// Field carrying the display name of any record
pub const REC_NAME: &str = "rec_name";

/// Standard headers
pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";
    pub const USER_AGENT: &str = "tryton-console/0.1";
}

/// Build `model.<model>.<method>`
pub fn model_method(model: &str, method: &str) -> String {
    format!("model.{}.{}", model, method)
}

/// Build `wizard.<wizard>.<method>`
pub fn wizard_method(wizard: &str, method: &str) -> String {
    format!("wizard.{}.{}", wizard, method)
}

/// Database endpoint: `{url}/{database}/`
pub fn database_endpoint(base_url: &str, database: &str) -> String {
    format!(
        "{}/{}/",
        base_url.trim_end_matches('/'),
        urlencoding::encode(database)
    )
}
