//! Exportline DDB - table export decoding and entity projection
//!
//! Turns the tagged-JSON lines of a key-value table export into typed
//! business entities and Arrow record batches:
//!
//! ```no_run
//! use exportline_ddb::{Classifier, ExportReader, PartitionDate};
//!
//! let date = PartitionDate::parse("2024-01-02").unwrap();
//! let reader = ExportReader::new("./data/raw", "exports/core", vec![date]);
//! let classifier = Classifier::default();
//! let entities = reader.records().filter_map(|r| classifier.classify(&r)).count();
//! println!("{entities} entities, {:?}", reader.stats());
//! ```

pub mod classify;
pub mod coerce;
pub mod entity;
pub mod partition;
pub mod reader;
pub mod schema;
pub mod transform;
pub mod value;

pub use classify::{Classifier, DEFAULT_LINK_BASE_URL};
pub use entity::{EntityKind, EntityRecord};
pub use partition::{InvalidDate, PartitionDate, local_dates};
pub use reader::{ExportReader, ReaderStats};
pub use value::{AttrValue, DecodeError, RawRecord, decode, decode_item};
