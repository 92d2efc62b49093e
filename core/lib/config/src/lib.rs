pub mod configs;

pub use crate::configs::{
    ApiConfig, CasConfig, ExpiryConfig, OpQueueConfig, TaskCoordinatorConfig, VctConfig,
    WitnessConfig, WriterConfig,
};
