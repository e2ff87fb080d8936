use chrono::NaiveDate;
use sqlx::SqlitePool;
use storage::{dto::statistics::StatisticsResponse, repository::statistics::StatisticsRepository};

use crate::error::WebResult;

pub async fn get_statistics(pool: &SqlitePool, today: NaiveDate) -> WebResult<StatisticsResponse> {
    let repo = StatisticsRepository::new(pool);
    Ok(repo.summary(today).await?)
}
