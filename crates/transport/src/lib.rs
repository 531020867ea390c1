// In-process native channel for yanap sessions
// Connects a Session to an engine running on other threads.

pub mod channel;

pub use channel::{
    channel_pair, file_length_message, status_message, ChannelTransport, EngineEndpoint, Notifier,
};

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Install env_logger at Info level unless RUST_LOG says otherwise.
/// Safe to call repeatedly; only the first call does anything.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder()
            .is_test(false)
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .try_init();
    });
}
