// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! WASM inference engine built on wasmtime.
//!
//! Each model is one core WASM module loaded into its own store with a memory
//! cap and executed one call at a time. Modules follow a C-style ABI:
//!
//! - exports: `memory`, `allocate(size: i32) -> i32`, optionally
//!   `deallocate(ptr: i32, size: i32)`, and the inference function
//!   `(ptr: i32, len: i32) -> i32` named for its kind (`classify_error`,
//!   `sample_telemetry`, `extract_entities`);
//! - the inference function returns a pointer to a length-prefixed buffer:
//!   a little-endian u32 byte count followed by that many bytes of UTF-8 JSON;
//! - the single permitted import is `env.abort(i32, i32, i32, i32)`, provided
//!   for AssemblyScript-style modules; calling it fails the current call.
//!
//! Resource protection layers:
//! - fuel: a fixed computational budget per call stops runaway loops;
//! - epoch deadline: a millisecond ticker thread drives wall-clock timeouts;
//! - store limits: linear memory cannot grow past the configured cap, so an
//!   oversized allocation fails inside the module and surfaces as a memory
//!   error here.

use crate::observability::messages::runtime::{ModelLoaded, ModelReloaded};
use crate::observability::messages::StructuredLog;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::{InferenceEngine, ModelKind, ModelSpec};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use wasmtime::{
    Caller, Config, Engine, Linker, Memory, Module, Store, StoreLimits, StoreLimitsBuilder, Trap,
    TypedFunc,
};

/// Fuel budget per inference call (100M instructions).
const FUEL_LEVEL: u64 = 100_000_000;

/// Maximum compiled module size (16MB).
const MAX_MODULE_SIZE: usize = 16 * 1024 * 1024;

/// Maximum input size for one inference call (1MB).
const MAX_INPUT_SIZE: usize = 1024 * 1024;

/// Maximum output size accepted from a module (1MB).
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// One engine epoch tick. Epoch deadlines are expressed in ticks, so this is
/// also the timeout granularity.
const EPOCH_TICK: Duration = Duration::from_millis(1);

/// Abort arguments recorded when a module calls `env.abort`.
#[derive(Debug, Clone, Copy)]
struct AbortRecord {
    msg_ptr: i32,
    file_ptr: i32,
    line: i32,
    col: i32,
}

/// Per-store state: the memory limiter plus the last abort record.
struct StoreState {
    limits: StoreLimits,
    abort: Option<AbortRecord>,
}

/// A loaded model: its store, memory, and typed entry points.
struct ModelInstance {
    store: Store<StoreState>,
    memory: Memory,
    allocate: TypedFunc<i32, i32>,
    deallocate: Option<TypedFunc<(i32, i32), ()>>,
    infer: TypedFunc<(i32, i32), i32>,
    timeout: Duration,
    module_path: String,
}

impl ModelInstance {
    fn load(engine: &Engine, kind: ModelKind, spec: &ModelSpec) -> RuntimeResult<Self> {
        let module_bytes = std::fs::read(&spec.path)?;
        if module_bytes.len() > MAX_MODULE_SIZE {
            return Err(RuntimeError::ModuleLoad(format!(
                "module too large: {} bytes (max {} bytes)",
                module_bytes.len(),
                MAX_MODULE_SIZE
            )));
        }

        let module = Module::new(engine, &module_bytes)
            .map_err(|e| RuntimeError::ModuleLoad(e.to_string()))?;
        Self::validate_imports(&module)?;

        let limits = StoreLimitsBuilder::new()
            .memory_size(spec.memory_limit_mb * 1024 * 1024)
            .build();
        let mut store = Store::new(
            engine,
            StoreState {
                limits,
                abort: None,
            },
        );
        store.limiter(|state| &mut state.limits);

        let mut linker: Linker<StoreState> = Linker::new(engine);
        linker
            .func_wrap(
                "env",
                "abort",
                |mut caller: Caller<'_, StoreState>,
                 msg_ptr: i32,
                 file_ptr: i32,
                 line: i32,
                 col: i32|
                 -> anyhow::Result<()> {
                    caller.data_mut().abort = Some(AbortRecord {
                        msg_ptr,
                        file_ptr,
                        line,
                        col,
                    });
                    Err(anyhow::anyhow!("module called abort"))
                },
            )
            .map_err(|e| RuntimeError::ModuleLoad(e.to_string()))?;

        // Instantiation runs WASM (start functions, memory init); give it the
        // same budgets as a call so a hostile module cannot hang startup.
        store
            .set_fuel(FUEL_LEVEL)
            .map_err(|e| RuntimeError::ModuleLoad(e.to_string()))?;
        store.set_epoch_deadline(deadline_ticks(spec.timeout));

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| RuntimeError::ModuleLoad(e.to_string()))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| RuntimeError::ModuleLoad("module must export 'memory'".to_string()))?;
        let allocate = instance
            .get_typed_func::<i32, i32>(&mut store, "allocate")
            .map_err(|_| {
                RuntimeError::ModuleLoad(
                    "module must export 'allocate' with signature (i32) -> i32".to_string(),
                )
            })?;
        let deallocate = instance
            .get_typed_func::<(i32, i32), ()>(&mut store, "deallocate")
            .ok();
        let infer = instance
            .get_typed_func::<(i32, i32), i32>(&mut store, kind.export_name())
            .map_err(|_| {
                RuntimeError::ModuleLoad(format!(
                    "module must export '{}' with signature (i32, i32) -> i32",
                    kind.export_name()
                ))
            })?;

        Ok(Self {
            store,
            memory,
            allocate,
            deallocate,
            infer,
            timeout: spec.timeout,
            module_path: spec.path.display().to_string(),
        })
    }

    /// The only permitted import is `env.abort`.
    fn validate_imports(module: &Module) -> RuntimeResult<()> {
        for import in module.imports() {
            if import.module() != "env" || import.name() != "abort" {
                return Err(RuntimeError::ModuleLoad(format!(
                    "import '{}::{}' is not allowed; only env.abort is permitted",
                    import.module(),
                    import.name()
                )));
            }
        }
        Ok(())
    }

    /// Run one inference call: write the input into module memory, invoke the
    /// export, read back the length-prefixed result.
    fn call(&mut self, input: &str) -> RuntimeResult<String> {
        if input.len() > MAX_INPUT_SIZE {
            return Err(RuntimeError::Memory(format!(
                "input too large: {} bytes (max {} bytes)",
                input.len(),
                MAX_INPUT_SIZE
            )));
        }

        self.store.data_mut().abort = None;
        self.store
            .set_fuel(FUEL_LEVEL)
            .map_err(RuntimeError::Execution)?;
        self.store.set_epoch_deadline(deadline_ticks(self.timeout));

        let input_bytes = input.as_bytes();
        let input_len = input_bytes.len() as i32;

        let input_ptr = self
            .allocate
            .call(&mut self.store, input_len)
            .map_err(|e| self.classify_trap(e))?;
        if input_ptr <= 0 {
            return Err(RuntimeError::Memory(
                "module failed to allocate input buffer".to_string(),
            ));
        }

        self.memory
            .write(&mut self.store, input_ptr as usize, input_bytes)
            .map_err(|e| RuntimeError::Memory(format!("failed to write input: {e}")))?;

        let result = self
            .infer
            .call(&mut self.store, (input_ptr, input_len));

        // Input buffer is dead regardless of the call's outcome.
        if let Some(deallocate) = &self.deallocate {
            let _ = deallocate.call(&mut self.store, (input_ptr, input_len));
        }

        let result_ptr = result.map_err(|e| self.classify_trap(e))?;
        if result_ptr <= 0 {
            if let Some(abort) = self.store.data().abort {
                return Err(abort_error(abort));
            }
            return Err(RuntimeError::Execution(anyhow::anyhow!(
                "inference function returned null pointer"
            )));
        }

        let output = self.read_result(result_ptr)?;
        Ok(output)
    }

    /// Read a length-prefixed UTF-8 buffer out of module memory.
    fn read_result(&mut self, result_ptr: i32) -> RuntimeResult<String> {
        let mut len_bytes = [0u8; 4];
        self.memory
            .read(&self.store, result_ptr as usize, &mut len_bytes)
            .map_err(|e| RuntimeError::Memory(format!("failed to read result length: {e}")))?;
        let result_len = u32::from_le_bytes(len_bytes) as usize;

        if result_len > MAX_OUTPUT_SIZE {
            return Err(RuntimeError::Memory(format!(
                "result too large: {result_len} bytes (max {MAX_OUTPUT_SIZE} bytes)"
            )));
        }

        let mut output_bytes = vec![0u8; result_len];
        self.memory
            .read(&self.store, result_ptr as usize + 4, &mut output_bytes)
            .map_err(|e| RuntimeError::Memory(format!("failed to read result: {e}")))?;

        if let Some(deallocate) = &self.deallocate {
            let _ = deallocate.call(&mut self.store, (result_ptr, result_len as i32 + 4));
        }

        String::from_utf8(output_bytes)
            .map_err(|e| RuntimeError::ResultDecode(format!("result is not UTF-8: {e}")))
    }

    /// Map a trap coming out of the sandbox onto the runtime error taxonomy.
    fn classify_trap(&self, err: anyhow::Error) -> RuntimeError {
        if let Some(abort) = self.store.data().abort {
            return abort_error(abort);
        }
        if let Some(trap) = err.downcast_ref::<Trap>() {
            return match trap {
                Trap::Interrupt | Trap::OutOfFuel => RuntimeError::Timeout(self.timeout),
                _ => RuntimeError::Execution(err),
            };
        }
        RuntimeError::Execution(err)
    }
}

fn abort_error(abort: AbortRecord) -> RuntimeError {
    RuntimeError::ModuleAbort {
        msg_ptr: abort.msg_ptr,
        file_ptr: abort.file_ptr,
        line: abort.line,
        col: abort.col,
    }
}

/// Epoch deadline in ticks for a wall-clock timeout.
fn deadline_ticks(timeout: Duration) -> u64 {
    (timeout.as_millis() as u64 / EPOCH_TICK.as_millis() as u64).max(1) + 1
}

/// Background thread driving the engine epoch for wall-clock deadlines.
struct EpochTicker {
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl EpochTicker {
    fn start(engine: Engine) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("wasm-epoch-ticker".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    std::thread::sleep(EPOCH_TICK);
                    engine.increment_epoch();
                }
            })
            .expect("failed to spawn epoch ticker thread");
        Self {
            stop,
            handle: Mutex::new(Some(handle)),
        }
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

/// One model slot: the live instance plus the spec used to (re)load it.
struct ModelSlot {
    instance: RwLock<Option<Arc<Mutex<ModelInstance>>>>,
    spec: Mutex<Option<ModelSpec>>,
}

impl ModelSlot {
    fn empty() -> Self {
        Self {
            instance: RwLock::new(None),
            spec: Mutex::new(None),
        }
    }
}

/// The concrete WASM-backed inference engine: three model slots on one
/// wasmtime engine, with a shared epoch ticker.
pub struct WasmEngine {
    engine: Engine,
    slots: [ModelSlot; 3],
    ticker: EpochTicker,
}

impl std::fmt::Debug for WasmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmEngine").finish_non_exhaustive()
    }
}

impl WasmEngine {
    /// Build the engine and load every configured model. A configured model
    /// that fails to load is fatal; an unconfigured kind is simply absent and
    /// calls against it return `ModuleNotLoaded`.
    pub fn new(specs: [Option<ModelSpec>; 3]) -> RuntimeResult<Self> {
        let engine = Engine::new(&Self::engine_config())
            .map_err(|e| RuntimeError::ModuleLoad(e.to_string()))?;
        let ticker = EpochTicker::start(engine.clone());
        let wasm = Self {
            engine,
            slots: [ModelSlot::empty(), ModelSlot::empty(), ModelSlot::empty()],
            ticker,
        };

        for kind in ModelKind::ALL {
            if let Some(spec) = &specs[kind.index()] {
                let instance = ModelInstance::load(&wasm.engine, kind, spec)?;
                ModelLoaded {
                    kind: kind.as_str(),
                    module_path: &instance.module_path,
                    memory_limit_mb: spec.memory_limit_mb,
                    timeout_ms: spec.timeout.as_millis() as u64,
                }
                .log();
                let slot = &wasm.slots[kind.index()];
                *slot.instance.write().unwrap() = Some(Arc::new(Mutex::new(instance)));
                *slot.spec.lock().unwrap() = Some(spec.clone());
            }
        }

        Ok(wasm)
    }

    fn engine_config() -> Config {
        let mut config = Config::new();
        config.wasm_threads(false);
        config.wasm_simd(false);
        config.wasm_relaxed_simd(false);
        config.wasm_multi_memory(false);
        config.wasm_memory64(false);
        config.wasm_component_model(false);
        config.consume_fuel(true);
        config.epoch_interruption(true);
        config
    }
}

impl InferenceEngine for WasmEngine {
    fn infer(&self, kind: ModelKind, input: &str) -> RuntimeResult<String> {
        // Clone the Arc out of the slot so a concurrent reload swaps the slot
        // without touching this call; the prior instance is released when the
        // last in-flight call drops its handle.
        let instance = self.slots[kind.index()]
            .instance
            .read()
            .unwrap()
            .clone()
            .ok_or(RuntimeError::ModuleNotLoaded(kind.as_str()))?;

        let mut guard = instance.lock().unwrap();
        guard.call(input)
    }

    fn reload(&self, kind: ModelKind, path: &Path) -> RuntimeResult<()> {
        let slot = &self.slots[kind.index()];
        let spec = {
            let current = slot.spec.lock().unwrap();
            match current.as_ref() {
                Some(spec) => ModelSpec {
                    path: path.to_path_buf(),
                    ..spec.clone()
                },
                None => ModelSpec::with_defaults(path.to_path_buf()),
            }
        };

        // Load before swapping: a reload failure leaves the prior instance
        // serving calls.
        let instance = ModelInstance::load(&self.engine, kind, &spec)?;
        ModelReloaded {
            kind: kind.as_str(),
            module_path: &instance.module_path,
        }
        .log();

        *slot.instance.write().unwrap() = Some(Arc::new(Mutex::new(instance)));
        *slot.spec.lock().unwrap() = Some(spec);
        Ok(())
    }

    fn close(&self) {
        for slot in &self.slots {
            *slot.instance.write().unwrap() = None;
        }
        self.ticker.stop();
    }
}

impl Drop for WasmEngine {
    fn drop(&mut self) {
        self.ticker.stop();
    }
}
