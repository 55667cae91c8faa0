//! Remote collaborators of the batch pipeline
//!
//! The pipeline only talks to the platform through the traits in this module,
//! so every piece can be swapped out (and faked in tests).
//!
//! ## Architecture
//!
//! - [`SessionFactory`] opens a [`Session`] per task, binding the task's cookie
//!   and proxy to a [`ListingSource`](crate::walker::ListingSource), a
//!   [`DetailSource`], a [`ProfileResolver`] and a [`MediaDownloader`].
//! - [`NoteExtractor`] and [`RecordStore`] are task-independent and shared.
//!
//! Default implementations:
//!
//! - [`HttpSessionFactory`] / [`XhsClient`]: reqwest against the platform
//! - [`HttpMediaDownloader`]: streams files into the download directory
//! - [`InitialStateExtractor`]: reads the page state embedded in item pages
//! - [`UnsignedRequests`]: [`RequestSigner`] that adds nothing
//! - [`Database`](crate::db::Database) implements [`RecordStore`]

mod client;
mod extract;
mod media;
mod signer;
mod traits;

pub use client::{HttpSessionFactory, LinkPatterns, XhsClient};
pub use extract::InitialStateExtractor;
pub use media::HttpMediaDownloader;
pub use signer::UnsignedRequests;
pub use traits::{
    DetailSource, MediaDownloader, NoteExtractor, ProfileResolver, RecordStore, RequestSigner,
    Session, SessionFactory,
};
