pub mod db;
pub mod memory;
pub mod state;

pub use db::RocksDbStore;
pub use memory::MemoryGateStore;
pub use state::GateStore;
