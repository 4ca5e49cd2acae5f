//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod index;
mod listen;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use index::{build_corpus, run_index};
pub use listen::run_listen;
pub use search::run_search;
