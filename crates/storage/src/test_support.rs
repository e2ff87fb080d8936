use chrono::NaiveDate;

use crate::Database;
use crate::dto::participant::NewParticipant;
use crate::models::ParticipantStatus;

/// Migrated in-memory database.
pub(crate) async fn test_database() -> Database {
    let db = Database::in_memory().await.expect("open in-memory database");
    db.run_migrations().await.expect("run migrations");
    db
}

/// Distinct participant number `n`; never hashes anything.
pub(crate) fn new_participant(n: usize) -> NewParticipant {
    NewParticipant {
        full_name: format!("Peserta Uji {n}"),
        nisn: format!("{}", 1_000_000_000 + n),
        birth_date: NaiveDate::from_ymd_opt(2005, 3, 15).expect("valid date"),
        username: format!("peserta{n:03}"),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
        participant_id: format!("TKA13-{n:03}"),
        status: ParticipantStatus::Aktif,
    }
}
