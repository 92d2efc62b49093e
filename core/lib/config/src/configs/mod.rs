mod api;
mod cas;
mod expiry;
mod opqueue;
mod task_coordinator;
mod vct;
mod witness;
mod writer;

pub use self::{
    api::ApiConfig, cas::CasConfig, expiry::ExpiryConfig, opqueue::OpQueueConfig,
    task_coordinator::TaskCoordinatorConfig, vct::VctConfig, witness::WitnessConfig,
    writer::WriterConfig,
};
