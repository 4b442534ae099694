// Synthesized timestamps for ingested posts and comments

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rand::Rng;

/// Comments are placed at most this many days after their post.
pub const COMMENT_MAX_DAYS_AFTER_POST: i64 = 30;

/// Widest accepted post window, about a century.
pub const MAX_DATE_RANGE_DAYS: i64 = 36_500;

const SECONDS_PER_DAY: i64 = 86_400;

/// Random instant in `[now - days_back, now]`, offset from `now` by whole
/// seconds. Results are truncated to milliseconds, the precision MongoDB keeps,
/// so range queries agree across store backends.
pub fn random_post_date<R: Rng>(rng: &mut R, now: DateTime<Utc>, days_back: i64) -> DateTime<Utc> {
    let window = days_back.clamp(1, MAX_DATE_RANGE_DAYS) * SECONDS_PER_DAY;
    (now - Duration::seconds(rng.gen_range(0..=window))).trunc_subsecs(3)
}

/// Random instant between the post and `min(post + 30 days, now)`. When that
/// window is empty the comment lands 1 to 60 minutes after the post.
pub fn random_comment_date<R: Rng>(
    rng: &mut R,
    now: DateTime<Utc>,
    post_created_at: DateTime<Utc>,
) -> DateTime<Utc> {
    let latest = (post_created_at + Duration::days(COMMENT_MAX_DAYS_AFTER_POST)).min(now);
    let window = (latest - post_created_at).num_seconds();

    let offset = if window <= 0 {
        rng.gen_range(60..=3600)
    } else {
        rng.gen_range(0..=window)
    };

    (post_created_at + Duration::seconds(offset)).trunc_subsecs(3)
}
