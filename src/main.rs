use otel_ai_processor::config::{load_and_validate_config, Config};
use otel_ai_processor::processors::create_traces;
use otel_ai_processor::telemetry::{
    AttrMap, Resource, Scope, Span, SpanKind, SpanStatus, TraceBatch,
};
use otel_ai_processor::traits::TracesConsumer;
use std::env;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Consumer that prints what reaches the end of the pipeline.
struct PrintingConsumer;

#[async_trait::async_trait]
impl TracesConsumer for PrintingConsumer {
    async fn consume_traces(
        &self,
        _ctx: &CancellationToken,
        batch: TraceBatch,
    ) -> anyhow::Result<()> {
        println!("📦 Downstream received {} span(s):", batch.span_count());
        for rs in &batch.resource_spans {
            for ss in &rs.scopes {
                for span in &ss.spans {
                    println!("  • {} [{}]", span.name, span.status.code.as_str());
                    for (key, value) in span.attributes.iter() {
                        if key.starts_with("ai.") {
                            println!("      {key} = {}", value.render());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn demo_batch() -> TraceBatch {
    let mut resource_attrs = AttrMap::new();
    resource_attrs.insert("service.name", "user-service");
    resource_attrs.insert("deployment.environment", "demo");
    let resource = Resource::new(resource_attrs);

    let mut error_attrs = AttrMap::new();
    error_attrs.insert("db.system", "postgresql");

    let mut batch = TraceBatch::new();
    let hash = resource.fnv_hash();
    let rs = batch.get_or_create_resource(&resource, hash);
    let ss = rs.get_or_create_scope(&Scope::new("demo-instrumentation", "1.0"));
    ss.spans.push(Span {
        name: "db.query".to_string(),
        kind: SpanKind::Client,
        status: SpanStatus::error("Connection refused to database"),
        start_unix_nano: 1_000_000_000,
        end_unix_nano: 1_042_000_000,
        attributes: error_attrs,
        events: Vec::new(),
    });
    for i in 0..8 {
        ss.spans.push(Span {
            name: format!("http.get /api/users/{i}"),
            kind: SpanKind::Server,
            status: SpanStatus::ok(),
            start_unix_nano: 1_000_000_000,
            end_unix_nano: 1_000_000_000 + (i + 1) * 3_000_000,
            attributes: AttrMap::new(),
            events: Vec::new(),
        });
    }
    batch
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    println!("🚀 AI Telemetry Processor Demo");
    println!("═══════════════════════════════");

    let config = match args.get(1) {
        Some(path) => match load_and_validate_config(path) {
            Ok(cfg) => {
                println!("📋 Configuration: {path}");
                cfg
            }
            Err(e) => {
                eprintln!("❌ Failed to load {path}: {e}");
                std::process::exit(1);
            }
        },
        None => {
            // No config file: run with defaults minus model files, so the
            // demo works without WASM modules on disk (inference falls back
            // to un-enriched behavior and rate-based sampling).
            let mut cfg = Config::default();
            cfg.models.error_classifier.path = String::new();
            cfg.models.importance_sampler.path = String::new();
            cfg.models.entity_extractor.path = String::new();
            println!("📋 Configuration: built-in defaults (no models on disk)");
            cfg
        }
    };

    println!(
        "🔧 Features: classification={}, sampling={}, entities={}",
        config.features.error_classification,
        config.features.smart_sampling,
        config.features.entity_extraction,
    );
    println!(
        "⚙️  Sampling rates: errors={}, slow={}, normal={} (threshold {}ms)",
        config.sampling.error_events,
        config.sampling.slow_spans,
        config.sampling.normal_spans,
        config.sampling.threshold_ms,
    );

    let processor = match create_traces(&config, Arc::new(PrintingConsumer)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ Failed to create processor: {e}");
            std::process::exit(1);
        }
    };

    let batch = demo_batch();
    println!("\n📤 Feeding {} span(s) through the pipeline...\n", batch.span_count());

    let ctx = CancellationToken::new();
    let start = Instant::now();
    match processor.consume_traces(&ctx, batch).await {
        Ok(()) => println!("\n⏱️  Processed in {:?}", start.elapsed()),
        Err(e) => eprintln!("❌ Processing failed: {e}"),
    }

    if let Err(e) = processor.shutdown().await {
        eprintln!("❌ Shutdown failed: {e}");
    }
    println!("🎉 Demo complete!");
}
