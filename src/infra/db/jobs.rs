use async_trait::async_trait;

use crate::application::repos::{JobSubmission, JobsRepo, NewJobRecord, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl JobsRepo for PostgresRepositories {
    /// Inserts into the apalis queue under a deterministic id. An existing
    /// job is only re-armed once it has reached a terminal state.
    async fn submit_job(&self, job: NewJobRecord) -> Result<JobSubmission, RepoError> {
        let inserted: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO apalis.jobs
                (job, id, job_type, status, attempts, max_attempts, run_at, priority)
            VALUES ($1, $2, $3, 'Pending', 0, $4, now(), $5)
            ON CONFLICT (id) DO UPDATE
               SET job = EXCLUDED.job,
                   status = 'Pending',
                   attempts = 0,
                   max_attempts = EXCLUDED.max_attempts,
                   run_at = now(),
                   priority = EXCLUDED.priority,
                   last_error = NULL,
                   lock_at = NULL,
                   lock_by = NULL,
                   done_at = NULL
             WHERE apalis.jobs.status IN ('Done', 'Failed', 'Killed')
            RETURNING id
            "#,
        )
        .bind(&job.payload)
        .bind(&job.id)
        .bind(job.job_type.as_str())
        .bind(job.max_attempts)
        .bind(job.priority)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(match inserted {
            Some(id) => JobSubmission::Accepted(id),
            None => JobSubmission::Duplicate(job.id),
        })
    }
}
