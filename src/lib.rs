//! Datarepo – an in-process, concurrently accessible hierarchical key/value store.
//!
//! Every key carries:
//! * a fixed [`datatype::ValueKind`] chosen when the key is created,
//! * an optional access policy of read, write and delete passwords,
//! * a type enforcement flag selecting strict or lenient coercion of written values.
//!
//! Values live in [`construct::Cell`]s. A cell never mutates its state in place: each
//! write builds a new immutable [`construct::Snapshot`] and publishes it with a single
//! atomic pointer swap, so readers never block and never see a torn value.
//!
//! ## Modules
//! * [`datatype`] – value kinds, stored scalars, incoming values and the coercion table.
//! * [`construct`] – cells, snapshots, access policies and the [`construct::DataRepo`] key space.
//! * [`path`] – the dotted key convention with `{entity}` and `[index]` segments.
//! * [`query`] – prefix, wildcard, child, entity and array searches over the key space.
//! * [`ingest`] – flattening JSON documents into keys.
//! * [`settings`] – layered configuration for the `datarepo` binary.
//!
//! ## Quick Start
//! ```
//! use datarepo::construct::{DataRepo, KeyOptions};
//! use datarepo::datatype::ValueKind;
//! let repo = DataRepo::new();
//! repo.create_key("devices.{A1}.speed", ValueKind::Integer, &KeyOptions::new()).unwrap();
//! repo.write("devices.{A1}.speed", "120", None).unwrap();
//! assert_eq!(repo.read_string("devices.{A1}.speed", None).unwrap(), "120");
//! assert!(repo.entity_ids("devices").unwrap().contains("A1"));
//! ```
//!
//! ## Sharing
//! There is no global instance. Create one [`construct::DataRepo`] and hand it to
//! consumers by reference or inside an `Arc`; every operation takes `&self`.

pub mod construct;
pub mod datatype;
pub mod error;
pub mod ingest;
pub mod path;
pub mod query;
pub mod settings;

pub use construct::{Access, Cell, DataRepo, KeyOptions, Snapshot};
pub use datatype::{TypedScalar, Value, ValueKind};
pub use error::{RepoError, Result};
