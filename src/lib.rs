pub mod config;     // config schema + validation
pub mod errors;     // error handling
pub mod features;   // feature records, canonical JSON, fingerprints
pub mod observability;
pub mod pool;       // bounded worker pool
pub mod processors; // per-signal processors + factory
pub mod runtime;    // WASM inference runtime
pub mod telemetry;  // telemetry data model
pub mod traits;     // consumer abstractions
