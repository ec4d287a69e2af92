use crate::domain::error::AppError;
use crate::domain::filter::{ListingParams, ListingQuery};
use crate::domain::model::{LeadListPage, Validate};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

pub async fn list_leads(
    state: &AppState,
    params: &ListingParams,
    now: DateTime<Utc>,
) -> Result<LeadListPage, AppError> {
    let query = ListingQuery::from_params(params, now);
    let key = query.cache_key();

    // 1. Result cache
    if let Some(cached) = state.cache.lookup(&key) {
        info!(page = query.page, page_size = query.page_size, "cache hit");
        return Ok(cached);
    }

    debug!(?query, "listing leads");

    // 2. Page and total run as one unit behind the gate
    let store = &state.store;
    let unit = &query;
    let (items, total) = state
        .gate
        .run(|| async move {
            let items = store.find_leads(unit).await?;
            let total = store.count_leads(&unit.filter).await?;
            Ok::<_, AppError>((items, total))
        })
        .await?;

    let page = LeadListPage {
        items,
        total,
        page: query.page,
        page_size: query.page_size,
    };
    page.validate()?;

    // 3. Write back
    state.cache.store(key, page.clone());
    Ok(page)
}
