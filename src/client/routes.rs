//! Client route table.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Debates,
    CreateDebate,
    Debate(String),
    Profile(String),
    Settings,
    Terms,
    Privacy,
    Guidelines,
    Contact,
    NotFound,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Debates => "/debates".to_string(),
            Route::CreateDebate => "/debates/create".to_string(),
            Route::Debate(id) => format!("/debates/{}", id),
            Route::Profile(username) => format!("/profile/{}", username),
            Route::Settings => "/settings".to_string(),
            Route::Terms => "/terms".to_string(),
            Route::Privacy => "/privacy".to_string(),
            Route::Guidelines => "/guidelines".to_string(),
            Route::Contact => "/contact".to_string(),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// Resolve a path. Anything unrecognised is [`Route::NotFound`].
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["debates"] => Route::Debates,
            ["debates", "create"] => Route::CreateDebate,
            ["debates", id] if !id.is_empty() => Route::Debate(id.to_string()),
            ["profile", username] if !username.is_empty() => Route::Profile(username.to_string()),
            ["settings"] => Route::Settings,
            ["terms"] => Route::Terms,
            ["privacy"] => Route::Privacy,
            ["guidelines"] => Route::Guidelines,
            ["contact"] => Route::Contact,
            _ => Route::NotFound,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
