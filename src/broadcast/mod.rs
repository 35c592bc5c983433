pub mod ack;
pub mod ingest;

pub use ack::{AckPublisher, AckStatus, Acknowledgement, LogPublisher};
pub use ingest::{run_ingestion, ChannelSource, EventSource, StdinSource};
