//! Prometheus counters for the bot
//!
//! Registered in the default registry and exposed on `GET /metrics` by the
//! web server.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

/// Webhook updates accepted by the HTTP endpoint
pub static UPDATES_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("opibot_updates_received_total", "Total number of updates received").unwrap()
});

/// Webhook payloads that could not be deserialized
pub static UPDATES_MALFORMED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "opibot_updates_malformed_total",
        "Total number of webhook payloads that failed to deserialize"
    )
    .unwrap()
});

/// Handled commands and buttons
/// Labels: command (start/help/add/update/export/show/fields/wells, the
/// button flows add_flow/update_flow, `text` for every answer to a pending
/// step, `unknown` for free text with nothing pending)
pub static COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "opibot_commands_total",
        "Total number of handled commands by name",
        &["command"]
    )
    .unwrap()
});

/// Store mutations by outcome
/// Labels: operation (create/update), outcome (ok/duplicate/not_found/unavailable)
pub static STORE_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "opibot_store_operations_total",
        "Total number of record store mutations by outcome",
        &["operation", "outcome"]
    )
    .unwrap()
});

/// Outbound replies that the Bot API rejected or that failed in transit
pub static SEND_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "opibot_send_failures_total",
        "Total number of replies that failed to send"
    )
    .unwrap()
});

/// Forces registration so every series shows up on the first scrape.
pub fn init_metrics() {
    Lazy::force(&UPDATES_RECEIVED_TOTAL);
    Lazy::force(&UPDATES_MALFORMED_TOTAL);
    Lazy::force(&COMMANDS_TOTAL);
    Lazy::force(&STORE_OPERATIONS_TOTAL);
    Lazy::force(&SEND_FAILURES_TOTAL);
}

/// Counts one handled command.
pub fn record_command(command: &str) {
    COMMANDS_TOTAL.with_label_values(&[command]).inc();
}

/// Counts one store mutation outcome.
pub fn record_store_operation(operation: &str, outcome: &str) {
    STORE_OPERATIONS_TOTAL.with_label_values(&[operation, outcome]).inc();
}

/// Renders all registered metrics in the text exposition format.
pub fn render() -> Result<String, prometheus::Error> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_counters() {
        init_metrics();
        record_command("help");
        let text = render().unwrap();
        assert!(text.contains("opibot_commands_total"));
        assert!(text.contains("opibot_updates_received_total"));
    }
}
