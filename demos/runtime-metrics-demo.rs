use std::alloc::System;
use std::sync::Arc;

use log::info;
use runtime_metrics::collectors::{MemStatsCollector, SysStatsCollector};
use runtime_metrics::registry::LocalRegistry;
use runtime_metrics::{Collector, ProcessReader, SystemClock};
use stats_alloc::{StatsAlloc, INSTRUMENTED_SYSTEM};

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

fn main() {
    let mut log_builder = pretty_env_logger::formatted_builder();
    log_builder.parse_filters("debug");
    log_builder.init();

    let registry = Arc::new(LocalRegistry::new().with_common_tag("nf.app", "runtime-metrics-demo"));
    let reader = Arc::new(ProcessReader::with_allocator(GLOBAL));

    let mut memory = MemStatsCollector::new(registry.clone(), Arc::new(SystemClock), reader.clone());
    let mut system = SysStatsCollector::new(registry.clone(), reader);

    // the first pass only sets the counter baselines
    memory.collect();
    system.collect();

    let garbage: Vec<String> = (0..10_000).map(|i| format!("object {i}")).collect();
    info!("allocated {} strings", garbage.len());
    drop(garbage);

    memory.collect();
    system.collect();

    match registry.measurements_json() {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to render measurements: {err}"),
    }
}
