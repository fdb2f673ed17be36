use crate::{
    application::repos::{JobSubmission, JobsRepo, NewJobRecord, RepoError},
    domain::types::JobType,
};

pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;
pub const DEFAULT_PRIORITY: i32 = 0;

/// Enqueue a job under a caller-chosen id. A pending job with the same id
/// makes this a no-op reported as [`JobSubmission::Duplicate`].
pub async fn enqueue_job<J, P>(
    repo: &J,
    job_id: impl Into<String>,
    job_type: JobType,
    payload: &P,
) -> Result<JobSubmission, RepoError>
where
    J: JobsRepo + ?Sized,
    P: serde::Serialize,
{
    let payload = serde_json::to_value(payload)
        .map_err(|err| RepoError::from_persistence(err.to_string()))?;
    let record = NewJobRecord {
        id: job_id.into(),
        job_type,
        payload,
        max_attempts: DEFAULT_MAX_ATTEMPTS,
        priority: DEFAULT_PRIORITY,
    };

    repo.submit_job(record).await
}
