// src/queue/identity.rs — Worker identity for journal naming

pub const JOB_ID_ENV: &str = "SWITCHGEAR_JOB_ID";

/// `--job-id` > `$SWITCHGEAR_JOB_ID` > `<host>_<pid>`.
///
/// The host+pid default is only unique for one worker per process id on a
/// host. Batch launchers that start many workers at once should pass an
/// explicit id so a restarted worker finds its own journal again.
pub fn resolve_job_id(explicit: Option<&str>) -> String {
    let env = std::env::var(JOB_ID_ENV).ok();
    resolve_from(explicit, env.as_deref())
}

fn resolve_from(explicit: Option<&str>, env: Option<&str>) -> String {
    let raw = explicit
        .or(env)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(default_job_id);
    sanitize(&raw)
}

fn default_job_id() -> String {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    format!("{}_{}", host, std::process::id())
}

/// Keep the id usable as a file name prefix.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
