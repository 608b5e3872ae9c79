use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;

pub struct Metrics {
    datagrams: Counter<u64>,
    store_writes: Counter<u64>,
    datagram_bytes: Histogram<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        // TODO: deprecated crate to be replaced with an OLTP exporter
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .unwrap();

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("detection_relay");
        global::set_meter_provider(provider);

        let datagrams = meter
            .u64_counter("datagrams_total")
            .with_description("Total number of datagrams received, by outcome")
            .build();

        let store_writes = meter
            .u64_counter("store_writes_total")
            .with_description("Total number of batches written to the latest-batch store")
            .build();

        let datagram_bytes = meter
            .u64_histogram("datagram_bytes")
            .with_boundaries(size_class_boundaries(64, 4096))
            .with_description("Payload size of received datagrams in bytes")
            .build();

        Metrics {
            datagrams,
            store_writes,
            datagram_bytes,
            registry,
        }
    }

    pub fn record_accepted_datagram(&self, bytes: usize) {
        self.record_datagram("accepted", bytes);
    }

    pub fn record_rejected_datagram(&self, bytes: usize) {
        self.record_datagram("rejected", bytes);
    }

    fn record_datagram(&self, outcome: &'static str, bytes: usize) {
        let attributes = vec![KeyValue::new("outcome", outcome)];
        self.datagrams.add(1, &attributes);
        self.datagram_bytes.record(bytes as u64, &attributes);
    }

    pub fn record_store_write(&self) {
        self.store_writes.add(1, &[]);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Doubling bucket boundaries from `min` up to and including `max`.
fn size_class_boundaries(min: u64, max: u64) -> Vec<f64> {
    let mut boundaries = Vec::new();
    let mut size = min;
    while size <= max {
        boundaries.push(size as f64);
        size *= 2;
    }
    boundaries
}
