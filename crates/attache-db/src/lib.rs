//! Attache DB Library
//!
//! Persistence seam for the host records that own attachments. The handoff protocol
//! only ever reads one attachment-data column and writes it back; everything else
//! about the record belongs to the host.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod records;

pub use memory::InMemoryRecordRepository;
#[cfg(feature = "postgres")]
pub use postgres::PgRecordRepository;
pub use records::{data_attribute, Record, RecordRepository};
