//! Storage and catalog abstractions.
//!
//! The cleaning job never talks to a concrete storage service. It goes through two
//! traits:
//!
//! - [`ObjectIO`] - key/value blob storage with prefix listing (S3, GCS, a local
//!   directory tree)
//! - [`CatalogIO`] - registration of written locations as queryable tables
//!
//! Each comes with an in-memory fake for tests ([`FakeObjectIO`],
//! [`FakeCatalogIO`]) and a concrete implementation used by the binary
//! ([`LocalObjectIO`], [`ObjectCatalog`]).
//!
//! ## Unit Testing with Fakes
//! ```
//! use rawstage::io::cloud::*;
//!
//! # fn main() -> CloudResult<()> {
//! let storage = FakeObjectIO::new();
//! storage.put_object("bucket", "raw/2024-01-01/orders/a.csv", b"id\n1\n")?;
//!
//! let listed = storage.list_objects("bucket", Some("raw/"))?;
//! assert_eq!(listed.len(), 1);
//! assert_eq!(
//!     storage.object_uri("bucket", &listed[0].key),
//!     "mem://bucket/raw/2024-01-01/orders/a.csv"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`CloudResult<T>`] where the error is [`CloudIOError`],
//! categorized by [`ErrorKind`].

pub mod fake;
pub mod helpers;
pub mod local;
pub mod traits;

pub use fake::*;
pub use local::*;
pub use traits::*;
