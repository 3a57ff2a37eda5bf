//! Search API endpoints.

use axum::extract::{Query, State};

use super::{success, ApiResult};
use crate::models::{SearchHits, SearchQuery};
use crate::AppState;

/// Results per entity type when the caller does not ask for a limit.
pub const DEFAULT_SEARCH_LIMIT: i64 = 5;

/// Maximum number of results per entity type.
pub const MAX_SEARCH_LIMIT: i64 = 10;

/// Shortest trimmed term that triggers a lookup.
pub const MIN_SEARCH_LEN: usize = 2;

/// GET /api/search?q=.. - Pattern search over debates and profiles.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchHits> {
    let term = params.q.trim();
    if term.chars().count() < MIN_SEARCH_LEN {
        return success(SearchHits::default());
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let debates = state.repo.search_debates(term, limit).await?;
    let profiles = state.repo.search_profiles(term, limit).await?;

    success(SearchHits { debates, profiles })
}
