use lazy_static::lazy_static;
use prometheus::Counter;
use prometheus::CounterVec;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::Opts;
use prometheus::Registry;
use slog::debug;
use slog::Logger;

lazy_static! {
    pub static ref ZOO_CONNECTION_COUNT: Counter = Counter::new(
        "zkfacade_zookeeper_connect",
        "Number of sessions opened with the zookeeper ensemble since the process started"
    )
    .expect("Failed to create ZOO_CONNECTION_COUNT counter");
    pub static ref ZOO_OP_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "zkfacade_zookeeper_op_duration",
            "Duration (in seconds) of Zookeeper operations"
        ),
        &["operation"]
    )
    .expect("Failed to create ZOO_OP_DURATION histogram");
    pub static ref ZOO_OP_ERRORS_COUNT: CounterVec = CounterVec::new(
        Opts::new(
            "zkfacade_zookeeper_op_errors",
            "Number of Zookeeper operations that failed"
        ),
        &["operation"]
    )
    .expect("Failed to create ZOO_OP_ERRORS_COUNT counter");
    pub static ref ZOO_TIMEOUTS_COUNT: Counter = Counter::new(
        "zkfacade_zookeeper_timeouts",
        "Number of operations that failed due to timeouts"
    )
    .expect("Failed to create ZOO_TIMEOUTS_COUNT counter");
}

/// Attemps to register metrics with the Registry.
///
/// Metrics that fail to register are logged and ignored.
pub fn register_metrics(logger: &Logger, registry: &Registry) {
    if let Err(err) = registry.register(Box::new(ZOO_CONNECTION_COUNT.clone())) {
        debug!(logger, "Failed to register ZOO_CONNECTION_COUNT"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(ZOO_OP_DURATION.clone())) {
        debug!(logger, "Failed to register ZOO_OP_DURATION"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(ZOO_OP_ERRORS_COUNT.clone())) {
        debug!(logger, "Failed to register ZOO_OP_ERRORS_COUNT"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(ZOO_TIMEOUTS_COUNT.clone())) {
        debug!(logger, "Failed to register ZOO_TIMEOUTS_COUNT"; "error" => ?err);
    }
}

#[cfg(test)]
mod tests {
    use prometheus::Registry;
    use slog::o;
    use slog::Discard;
    use slog::Logger;

    use super::register_metrics;

    #[test]
    fn register_twice_is_ignored() {
        let logger = Logger::root(Discard, o!());
        let registry = Registry::new();
        register_metrics(&logger, &registry);
        register_metrics(&logger, &registry);
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|family| family.get_name() == "zkfacade_zookeeper_timeouts"));
    }
}
