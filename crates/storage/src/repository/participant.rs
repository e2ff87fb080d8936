use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::dto::participant::{
    NewParticipant, ParticipantChanges, ParticipantDetailResponse, ParticipantFilter,
};
use crate::error::{Result, StorageError};
use crate::models::Participant;
use crate::repository::exam_result::ExamResultRepository;
use crate::services::credentials::{normalize_username, username_candidate};

const PARTICIPANT_COLUMNS: &str = "id, full_name, nisn, birth_date, username, password_hash, \
     participant_id, status, registration_date, updated_at";

pub struct ParticipantRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ParticipantRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of participants matching the filter, newest registrations
    /// first, plus the total number of matches.
    pub async fn list(&self, filter: &ParticipantFilter) -> Result<(Vec<Participant>, i64)> {
        let pagination = filter.pagination();

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM participants WHERE 1=1");
        push_filters(&mut count, filter);
        let total_items = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        query.push(PARTICIPANT_COLUMNS);
        query.push(" FROM participants WHERE 1=1");
        push_filters(&mut query, filter);
        query.push(" ORDER BY registration_date DESC, id DESC LIMIT ");
        query.push_bind(pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let participants = query
            .build_query_as::<Participant>()
            .fetch_all(self.pool)
            .await?;

        Ok((participants, total_items))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT id, full_name, nisn, birth_date, username, password_hash,
                   participant_id, status, registration_date, updated_at
            FROM participants
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(participant)
    }

    /// Participant with their exam results, latest first.
    pub async fn find_by_id_detailed(&self, id: i64) -> Result<ParticipantDetailResponse> {
        let participant = self.find_by_id(id).await?;
        let exam_results = ExamResultRepository::new(self.pool)
            .list_for_participant(participant.id)
            .await?;

        Ok(ParticipantDetailResponse {
            participant,
            exam_results,
        })
    }

    pub async fn nisn_exists(&self, nisn: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM participants WHERE nisn = ?)",
        )
        .bind(nisn)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM participants WHERE username = ?)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Generate a free username from a full name: the normalized name, then
    /// the same with `1`, `2`, ... appended.
    pub async fn generate_unique_username(&self, full_name: &str) -> Result<String> {
        let base = normalize_username(full_name);

        let mut attempt = 0;
        let mut username = username_candidate(&base, attempt);
        while self.username_exists(&username).await? {
            attempt += 1;
            username = username_candidate(&base, attempt);
        }

        Ok(username)
    }

    pub async fn list_nisn(&self) -> Result<Vec<String>> {
        let nisn = sqlx::query_scalar::<_, String>("SELECT nisn FROM participants ORDER BY nisn")
            .fetch_all(self.pool)
            .await?;

        Ok(nisn)
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM participants")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Insert a participant. The unique indexes on `nisn` and `username` are
    /// the final word on duplicates; violations come back as
    /// [`StorageError::Duplicate`].
    pub async fn insert(&self, participant: &NewParticipant) -> Result<Participant> {
        let now = Utc::now().naive_utc();

        let inserted = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants
                (full_name, nisn, birth_date, username, password_hash,
                 participant_id, status, registration_date, updated_at,
                 search_name, search_username)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, full_name, nisn, birth_date, username, password_hash,
                      participant_id, status, registration_date, updated_at
            "#,
        )
        .bind(&participant.full_name)
        .bind(&participant.nisn)
        .bind(participant.birth_date)
        .bind(&participant.username)
        .bind(&participant.password_hash)
        .bind(&participant.participant_id)
        .bind(participant.status)
        .bind(now)
        .bind(now)
        .bind(fold_case(&participant.full_name))
        .bind(fold_case(&participant.username))
        .fetch_one(self.pool)
        .await
        .map_err(|e| StorageError::from(e).classify())?;

        Ok(inserted)
    }

    /// Apply a partial update and stamp `updated_at`.
    pub async fn update(&self, id: i64, changes: &ParticipantChanges) -> Result<Participant> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE participants SET ");

        let mut fields = query.separated(", ");
        if let Some(full_name) = &changes.full_name {
            fields.push("full_name = ");
            fields.push_bind_unseparated(full_name.clone());
            fields.push("search_name = ");
            fields.push_bind_unseparated(fold_case(full_name));
        }
        if let Some(birth_date) = changes.birth_date {
            fields.push("birth_date = ");
            fields.push_bind_unseparated(birth_date);
        }
        if let Some(status) = changes.status {
            fields.push("status = ");
            fields.push_bind_unseparated(status);
        }
        if let Some(participant_id) = &changes.participant_id {
            fields.push("participant_id = ");
            fields.push_bind_unseparated(participant_id.clone());
        }
        fields.push("updated_at = ");
        fields.push_bind_unseparated(Utc::now().naive_utc());

        query.push(" WHERE id = ");
        query.push_bind(id);
        query.push(" RETURNING ");
        query.push(PARTICIPANT_COLUMNS);

        let updated = query
            .build_query_as::<Participant>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| StorageError::from(e).classify())?
            .ok_or(StorageError::NotFound)?;

        Ok(updated)
    }

    /// Hard delete. Exam results go with the row (`ON DELETE CASCADE`).
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM participants WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &ParticipantFilter) {
    if let Some(term) = filter.search_term() {
        let pattern = format!("%{}%", escape_like(&fold_case(term)));
        query.push(" AND (search_name LIKE ");
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\' OR nisn LIKE ");
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\' OR search_username LIKE ");
        query.push_bind(pattern);
        query.push(" ESCAPE '\\')");
    }

    // Invalid statuses are rejected before reaching the repository.
    if let Ok(Some(status)) = filter.status_filter() {
        query.push(" AND status = ");
        query.push_bind(status);
    }
}

/// Full Unicode lowercase, applied to both the stored search columns and the
/// search term.
fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Make `%`, `_` and `\` in user input match literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DuplicateField;
    use crate::models::ParticipantStatus;
    use crate::test_support::{new_participant, test_database};

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());

        let participant = repo.insert(&new_participant(1)).await.unwrap();

        assert!(participant.id > 0);
        assert_eq!(participant.nisn, "1000000001");
        assert_eq!(participant.status, ParticipantStatus::Aktif);
        assert_eq!(participant.registration_date, participant.updated_at);
    }

    #[tokio::test]
    async fn test_generate_unique_username_appends_suffix() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());

        assert_eq!(
            repo.generate_unique_username("Ahmad Wijaya").await.unwrap(),
            "ahmad.wijaya"
        );

        for (index, expected) in ["ahmad.wijaya", "ahmad.wijaya1", "ahmad.wijaya2"]
            .into_iter()
            .enumerate()
        {
            let username = repo.generate_unique_username("Ahmad  WIJAYA").await.unwrap();
            assert_eq!(username, expected);

            let mut participant = new_participant(index + 1);
            participant.username = username;
            repo.insert(&participant).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_duplicate_nisn_is_rejected_without_insert() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());
        repo.insert(&new_participant(1)).await.unwrap();

        let mut duplicate = new_participant(2);
        duplicate.nisn = new_participant(1).nisn;

        let err = repo.insert(&duplicate).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(DuplicateField::Nisn)));
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.nisn_exists("1000000001").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected_without_insert() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());
        repo.insert(&new_participant(1)).await.unwrap();

        let mut duplicate = new_participant(2);
        duplicate.username = new_participant(1).username;

        let err = repo.insert(&duplicate).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(DuplicateField::Username)));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());
        for n in 1..=25 {
            repo.insert(&new_participant(n)).await.unwrap();
        }

        let filter = ParticipantFilter {
            page: 2,
            limit: 10,
            ..Default::default()
        };
        let (page, total) = repo.list(&filter).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(page.len(), 10);

        let last = ParticipantFilter {
            page: 3,
            limit: 10,
            ..Default::default()
        };
        let (page, _) = repo.list(&last).await.unwrap();
        assert_eq!(page.len(), 5);
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());
        let first = repo.insert(&new_participant(1)).await.unwrap();
        let second = repo.insert(&new_participant(2)).await.unwrap();

        let (page, _) = repo.list(&ParticipantFilter::default()).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_list_search_is_case_insensitive_across_columns() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());

        let mut siti = new_participant(1);
        siti.full_name = "Siti Nurhaliza".to_string();
        siti.username = "siti.nurhaliza".to_string();
        repo.insert(&siti).await.unwrap();

        let mut budi = new_participant(2);
        budi.full_name = "Budi Rahmad".to_string();
        budi.username = "budi.rahmad".to_string();
        budi.nisn = "3456789012".to_string();
        repo.insert(&budi).await.unwrap();

        let search = |term: &str| ParticipantFilter {
            search: Some(term.to_string()),
            ..Default::default()
        };

        let (found, total) = repo.list(&search("NURHALIZA")).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].full_name, "Siti Nurhaliza");

        let (found, _) = repo.list(&search("56789")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "budi.rahmad");

        let (found, _) = repo.list(&search("Budi.R")).await.unwrap();
        assert_eq!(found.len(), 1);

        let (_, total) = repo.list(&search("%")).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_list_search_folds_non_ascii_case() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());

        let mut noman = new_participant(1);
        noman.full_name = "Ñoman Ölmez".to_string();
        let noman = repo.insert(&noman).await.unwrap();
        repo.insert(&new_participant(2)).await.unwrap();

        let search = |term: &str| ParticipantFilter {
            search: Some(term.to_string()),
            ..Default::default()
        };

        for term in ["Ñoman", "ñoman", "ÖLMEZ", "ñoman ölmez"] {
            let (found, total) = repo.list(&search(term)).await.unwrap();
            assert_eq!(total, 1, "{term}");
            assert_eq!(found[0].id, noman.id);
        }

        let changes = ParticipantChanges {
            full_name: Some("Érica Ünal".to_string()),
            ..Default::default()
        };
        repo.update(noman.id, &changes).await.unwrap();

        let (_, total) = repo.list(&search("Ñoman")).await.unwrap();
        assert_eq!(total, 0);
        let (found, total) = repo.list(&search("ÉRICA")).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].full_name, "Érica Ünal");
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());
        for n in 1..=4 {
            let mut participant = new_participant(n);
            if n % 2 == 0 {
                participant.status = ParticipantStatus::Menunggu;
            }
            repo.insert(&participant).await.unwrap();
        }

        let filter = ParticipantFilter {
            status: Some("menunggu".to_string()),
            ..Default::default()
        };
        let (found, total) = repo.list(&filter).await.unwrap();
        assert_eq!(total, 2);
        assert!(found.iter().all(|p| p.status == ParticipantStatus::Menunggu));
    }

    #[tokio::test]
    async fn test_update_merges_only_supplied_fields() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());
        let original = repo.insert(&new_participant(1)).await.unwrap();

        let changes = ParticipantChanges {
            status: Some(ParticipantStatus::Terblokir),
            ..Default::default()
        };
        let updated = repo.update(original.id, &changes).await.unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.status, ParticipantStatus::Terblokir);
        assert_eq!(updated.full_name, original.full_name);
        assert_eq!(updated.birth_date, original.birth_date);
        assert!(updated.updated_at >= original.updated_at);
        assert_eq!(updated.registration_date, original.registration_date);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());
        let existing = repo.insert(&new_participant(1)).await.unwrap();

        let changes = ParticipantChanges {
            full_name: Some("Someone Else".to_string()),
            ..Default::default()
        };
        let err = repo.update(existing.id + 100, &changes).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let unchanged = repo.find_by_id(existing.id).await.unwrap();
        assert_eq!(unchanged.full_name, existing.full_name);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let db = test_database().await;
        let repo = ParticipantRepository::new(db.pool());
        let participant = repo.insert(&new_participant(1)).await.unwrap();

        repo.delete(participant.id).await.unwrap();
        let err = repo.delete(participant.id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(matches!(
            repo.find_by_id(participant.id).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
