mod consts;
mod loader;
mod validation;

pub use consts::*;
pub use loader::{
    load_and_validate_config, load_config, Config, FeaturesConfig, ModelConfig, ModelsConfig,
    OutputConfig, ProcessingConfig, SamplingConfig,
};
pub use validation::{
    FeaturesSettings, ModelsSettings, OutputSettings, ProcessingSettings, SamplingSettings,
    Settings,
};
