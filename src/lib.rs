//! # Metadata Push
//!
//! Keeps a CSW metadata catalog in step with a local directory of ISO 19139
//! records. The directory is authoritative: records missing from the
//! catalog are inserted, records with a newer local `dateStamp` replace the
//! catalog copy, and catalog records of the organisation that no longer
//! exist locally are deleted. Outgoing records can have every responsible
//! party rewritten to one normalized organisation contact.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Local files │──▶│  Reconcile   │◀─▶│ CSW catalog  │
//! │  walkdir    │   │ +contact fix │   │ GetRecords / │
//! └─────────────┘   └──────┬───────┘   │ Transaction  │
//!                          │           └──────────────┘
//!                          ▼
//!                ┌──────────────────┐
//!                │ log + report     │
//!                └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mdpush check                  # validate config, list local records
//! mdpush index                  # list the catalog's records
//! mdpush push --dry-run         # classify without changing anything
//! mdpush push                   # reconcile
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`extract`] | Tag-value extraction from raw XML text |
//! | [`span`] | Text buffer with tracked ranges |
//! | [`contact`] | Responsible-party rewriting |
//! | [`connector_fs`] | Local metadata directory |
//! | [`catalog`] | CSW client and request bodies |
//! | [`reconcile`] | Remote index and reconciliation passes |
//! | [`report`] | Change report and outbox |
//! | [`progress`] | Progress reporting |
//! | [`logging`] | Run log setup and trimming |
//! | [`push`] | The `push` command |
//! | [`inspect`] | The `check`, `index` and `rewrite` commands |

pub mod catalog;
pub mod config;
pub mod connector_fs;
pub mod contact;
pub mod error;
pub mod extract;
pub mod inspect;
pub mod logging;
pub mod models;
pub mod progress;
pub mod push;
pub mod reconcile;
pub mod report;
pub mod span;
