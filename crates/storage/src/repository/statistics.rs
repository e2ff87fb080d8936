use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::dto::statistics::StatisticsResponse;
use crate::error::Result;

pub struct StatisticsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StatisticsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All dashboard counters in one read. `today` is the calendar day that
    /// counts as "today" for registrations.
    pub async fn summary(&self, today: NaiveDate) -> Result<StatisticsResponse> {
        let stats = sqlx::query_as::<_, StatisticsResponse>(
            r#"
            SELECT
                COUNT(*) AS total_participants,
                COALESCE(SUM(CASE WHEN status = 'aktif' THEN 1 ELSE 0 END), 0) AS active_participants,
                COALESCE(SUM(CASE WHEN status = 'menunggu' THEN 1 ELSE 0 END), 0) AS waiting_participants,
                COALESCE(SUM(CASE WHEN status = 'terblokir' THEN 1 ELSE 0 END), 0) AS blocked_participants,
                COALESCE(SUM(CASE WHEN date(registration_date) = ? THEN 1 ELSE 0 END), 0) AS today_registrations,
                (SELECT COUNT(DISTINCT participant_id) FROM exam_results) AS completed_exams
            FROM participants
            "#,
        )
        .bind(today)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, Utc};

    use super::*;
    use crate::dto::exam_result::CreateExamResultRequest;
    use crate::models::ParticipantStatus;
    use crate::repository::exam_result::ExamResultRepository;
    use crate::repository::participant::ParticipantRepository;
    use crate::test_support::{new_participant, test_database};

    fn exam(name: &str) -> CreateExamResultRequest {
        CreateExamResultRequest {
            exam_name: name.to_string(),
            score: 75.0,
            total_questions: 100,
            correct_answers: 75,
            wrong_answers: 25,
            duration: 130,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let db = test_database().await;
        let stats = StatisticsRepository::new(db.pool())
            .summary(Utc::now().date_naive())
            .await
            .unwrap();

        assert_eq!(
            stats,
            StatisticsResponse {
                total_participants: 0,
                active_participants: 0,
                waiting_participants: 0,
                blocked_participants: 0,
                today_registrations: 0,
                completed_exams: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_counts_per_status_and_exams() {
        let db = test_database().await;
        let participants = ParticipantRepository::new(db.pool());
        let statuses = [
            ParticipantStatus::Aktif,
            ParticipantStatus::Aktif,
            ParticipantStatus::Menunggu,
            ParticipantStatus::Terblokir,
        ];

        let mut ids = Vec::new();
        for (n, status) in statuses.into_iter().enumerate() {
            let mut participant = new_participant(n + 1);
            participant.status = status;
            ids.push(participants.insert(&participant).await.unwrap().id);
        }

        let exams = ExamResultRepository::new(db.pool());
        exams.create(ids[0], &exam("Simulasi 1")).await.unwrap();
        exams.create(ids[0], &exam("Simulasi 2")).await.unwrap();
        exams.create(ids[2], &exam("Simulasi 1")).await.unwrap();

        let today = Utc::now().date_naive();
        let stats = StatisticsRepository::new(db.pool()).summary(today).await.unwrap();

        assert_eq!(stats.total_participants, 4);
        assert_eq!(stats.active_participants, 2);
        assert_eq!(stats.waiting_participants, 1);
        assert_eq!(stats.blocked_participants, 1);
        assert_eq!(stats.today_registrations, 4);
        assert_eq!(stats.completed_exams, 2);

        let tomorrow = today.checked_add_days(Days::new(1)).unwrap();
        let stats = StatisticsRepository::new(db.pool()).summary(tomorrow).await.unwrap();
        assert_eq!(stats.today_registrations, 0);
    }
}
