use birthday_core::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid cron expression {expr:?}: {source}")]
    Cron {
        expr: String,
        #[source]
        source: ::cron::error::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
