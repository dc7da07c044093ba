//! Postgres contest store adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use crate::error::AppResult;
use crate::leaderboard::LeaderboardEntry;
use crate::models::{Challenge, Contest, ContestStatus, Participant, SubmissionAudit};

use super::ContestStore;

/// Contest store backed by Postgres. Challenges live as JSONB alongside the
/// contest row; final standings and the submission audit trail get their own
/// tables.
pub struct PgContestStore {
    pool: PgPool,
}

impl PgContestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run pending database migrations
    pub async fn migrate(pool: &PgPool) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| crate::error::AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[derive(FromRow)]
struct ContestRow {
    id: Uuid,
    join_code: String,
    title: String,
    topic: String,
    difficulty: String,
    host_name: String,
    host_key: String,
    duration_secs: i64,
    status: String,
    started_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    challenges: Json<Vec<Challenge>>,
}

fn parse_status(s: &str) -> ContestStatus {
    match s {
        "draft" => ContestStatus::Draft,
        "waiting" => ContestStatus::Waiting,
        "active" => ContestStatus::Active,
        _ => ContestStatus::Completed,
    }
}

impl From<ContestRow> for Contest {
    fn from(row: ContestRow) -> Self {
        Contest {
            id: row.id,
            join_code: row.join_code,
            title: row.title,
            topic: row.topic,
            difficulty: row.difficulty,
            host_name: row.host_name,
            host_key: row.host_key,
            duration_secs: row.duration_secs.max(0) as u64,
            status: parse_status(&row.status),
            started_at: row.started_at,
            ends_at: row.ends_at,
            challenges: row.challenges.0,
        }
    }
}

#[async_trait]
impl ContestStore for PgContestStore {
    async fn load(&self, join_code: &str) -> AppResult<Option<Contest>> {
        let row = sqlx::query_as::<_, ContestRow>(
            r#"
            SELECT id, join_code, title, topic, difficulty, host_name, host_key,
                   duration_secs, status, started_at, ends_at, challenges
            FROM contests
            WHERE join_code = $1
            "#,
        )
        .bind(join_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Contest::from))
    }

    async fn persist_final(
        &self,
        contest: &Contest,
        participants: &[Participant],
        leaderboard: &[LeaderboardEntry],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE contests
            SET status = $2, started_at = $3, ends_at = $4
            WHERE id = $1
            "#,
        )
        .bind(contest.id)
        .bind(contest.status.to_string())
        .bind(contest.started_at)
        .bind(contest.ends_at)
        .execute(&mut *tx)
        .await?;

        // Re-flush is idempotent: replace any previous final standings
        sqlx::query("DELETE FROM contest_results WHERE contest_id = $1")
            .bind(contest.id)
            .execute(&mut *tx)
            .await?;

        for entry in leaderboard {
            let records = participants
                .iter()
                .find(|p| p.id == entry.participant_id)
                .map(|p| serde_json::to_value(&p.records))
                .transpose()?
                .unwrap_or(serde_json::Value::Null);

            sqlx::query(
                r#"
                INSERT INTO contest_results
                    (contest_id, participant_id, name, rank, score, solved_count, records)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(contest.id)
            .bind(entry.participant_id)
            .bind(&entry.name)
            .bind(entry.rank as i32)
            .bind(entry.score as i64)
            .bind(entry.solved_count as i32)
            .bind(records)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn append_submission(&self, audit: &SubmissionAudit) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contest_submissions
                (contest_id, participant_id, challenge_index, language, code,
                 submitted_at, passed, total, points_earned, timed_out)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(audit.contest_id)
        .bind(audit.participant_id)
        .bind(audit.challenge_index as i32)
        .bind(&audit.language)
        .bind(&audit.code)
        .bind(audit.submitted_at)
        .bind(audit.passed as i32)
        .bind(audit.total as i32)
        .bind(audit.points_earned as i64)
        .bind(audit.timed_out)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
