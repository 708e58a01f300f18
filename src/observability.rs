use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("portfolio.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("portfolio.client.request_errors");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("portfolio.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("portfolio.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("portfolio.stream.bytes");

pub(crate) static SESSIONS_CREATED: Counter = Counter::new("portfolio.session.created");
pub(crate) static SESSION_CREATE_ERRORS: Counter =
    Counter::new("portfolio.session.create_errors");

pub(crate) static REPLY_FRAGMENTS: Counter = Counter::new("portfolio.reply.fragments");
pub(crate) static REPLY_FALLBACKS: Counter = Counter::new("portfolio.reply.fallbacks");
pub(crate) static REPLY_COMPLETED: Counter = Counter::new("portfolio.reply.completed");
pub(crate) static REPLY_FIRST_FRAGMENT: Moments =
    Moments::new("portfolio.reply.first_fragment_seconds");
pub(crate) static REPLY_DURATION: Moments = Moments::new("portfolio.reply.duration_seconds");

pub(crate) static TURNS_SUBMITTED: Counter = Counter::new("portfolio.chat.turns_submitted");
pub(crate) static TURNS_REJECTED: Counter = Counter::new("portfolio.chat.turns_rejected");
pub(crate) static TURNS_ABANDONED: Counter = Counter::new("portfolio.chat.turns_abandoned");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSIONS_CREATED);
    collector.register_counter(&SESSION_CREATE_ERRORS);

    collector.register_counter(&REPLY_FRAGMENTS);
    collector.register_counter(&REPLY_FALLBACKS);
    collector.register_counter(&REPLY_COMPLETED);
    collector.register_moments(&REPLY_FIRST_FRAGMENT);
    collector.register_moments(&REPLY_DURATION);

    collector.register_counter(&TURNS_SUBMITTED);
    collector.register_counter(&TURNS_REJECTED);
    collector.register_counter(&TURNS_ABANDONED);
}
