//! Resort reservation REST API.
//!
//! CRUD over reservation records persisted in a single flat JSON file, with
//! request and response bodies negotiable between JSON and XML.

pub mod config;
pub mod error;
pub mod negotiate;
pub mod record;
pub mod server;
pub mod store;
pub mod validate;
pub mod xml;

// Re-export key types for convenience
pub use config::AppConfig;
pub use error::ApiError;
pub use negotiate::BodyFormat;
pub use record::{JsonMap, Reservation};
pub use server::{router, serve, AppState};
pub use store::ReservationStore;
pub use validate::{ApprovedLists, ReservationSchema, ValidationError, Validator};
pub use xml::{record_to_xml, records_to_xml, xml_to_record, CodecError};
