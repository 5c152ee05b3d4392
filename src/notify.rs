use diesel::pg::PgConnection;
use diesel::prelude::*;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{Alert, Job, NewNotification};
use crate::schema::{alerts, notifications};

/// Fans a freshly created job out to saved-search alerts: every alert whose
/// title equals the job title exactly (case-sensitive, no trimming) yields
/// one notification for that alert's job seeker. Seekers holding several
/// identical alerts receive one notification per alert.
///
/// Failures here must never surface to the job-creation caller; each failed
/// insert is logged and skipped.
pub fn dispatch_job_notifications(conn: &mut PgConnection, job: &Job) -> QueryResult<usize> {
    let matching: Vec<Alert> = alerts::table
        .filter(alerts::title.eq(&job.title))
        .load(conn)?;

    let mut created = 0;
    for alert in &matching {
        let notification = NewNotification {
            id: Uuid::new_v4(),
            job_seeker_id: alert.job_seeker_id,
            job_id: job.id,
        };

        match diesel::insert_into(notifications::table)
            .values(&notification)
            .execute(conn)
        {
            Ok(_) => created += 1,
            Err(err) => {
                error!(
                    job_id = %job.id,
                    alert_id = %alert.id,
                    error = %err,
                    "failed to create notification for matching alert"
                );
            }
        }
    }

    if !matching.is_empty() {
        info!(
            job_id = %job.id,
            matched = matching.len(),
            created,
            "dispatched notifications for job alerts"
        );
    }

    Ok(created)
}
