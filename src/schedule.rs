//! The daily digest schedule.
//!
//! An explicit recurring schedule: compute the next fire time, sleep until
//! due, run the pipeline for every guild, repeat. The pipeline call is the
//! same one `/digest` makes, only the trigger differs.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Days;
use chrono::TimeDelta;
use chrono::Utc;

use crate::data::Digester;
use crate::data::HttpKey;
use crate::digest;
use crate::serenity;

/// When the digest after `now` should fire: the next UTC midnight.
fn next_fire_time(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Days::new(1);
    tomorrow
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
}

/// Runs daily digests forever. Spawned once at startup.
pub async fn run(ctx: serenity::Context, digester: Arc<Digester>) {
    loop {
        let now = Utc::now();
        let due = next_fire_time(now);
        let wait = (due - now).to_std().unwrap_or_default();
        tracing::info!("Daily digest will start in {:.2} hours.", wait.as_secs_f64() / 3600.0);
        tokio::time::sleep(wait).await;

        let to = Utc::now();
        let from = to - TimeDelta::hours(24);

        let http_client = {
            let data = ctx.data.read().await;
            data.get::<HttpKey>()
                .cloned()
                .expect("Expected http client")
        };

        // Guilds run one after another; one failing run never stops the
        // others or the schedule itself.
        for guild_id in ctx.cache.guilds() {
            if let Err(e) =
                digest::run_for_guild(&ctx, &http_client, &digester, guild_id, from, to).await
            {
                tracing::error!("Digest run failed for guild {guild_id}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use chrono::Timelike;

    #[test]
    fn fires_at_the_next_utc_midnight() {
        let now = DateTime::parse_from_rfc3339("2025-03-14T15:09:26Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        let due = next_fire_time(now);

        assert_eq!(due.time(), NaiveTime::MIN);
        assert_eq!(due.date_naive(), now.date_naive() + Days::new(1));
    }

    #[test]
    fn always_fires_in_the_future() {
        // Right at midnight, the next fire is a full day away.
        let midnight = DateTime::parse_from_rfc3339("2025-03-14T00:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        let due = next_fire_time(midnight);

        assert!(due > midnight);
        assert_eq!((due - midnight), TimeDelta::hours(24));
        assert_eq!(due.hour(), 0);
    }
}
