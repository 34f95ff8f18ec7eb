//! A differential, structure-aware oracle for SSZ codecs.
//!
//! The oracle drives candidate byte strings into a system under test and
//! cross-checks every observable behaviour (decode verdicts, re-encoded
//! bytes, hash tree roots, Merkle multiproofs) against the reference codec,
//! classifying divergence into a closed set of [`BugKind`]s.
//!
//! The crate also carries the harness around the oracle: a fixed preflight
//! suite of adversarial objects, a budget-bounded campaign runner with
//! uniform bucket selection, the host-facing schema catalog, content-
//! addressed seed corpora, an optional cross-language bridge oracle, and
//! the trace ring consumed by external coverage collectors.

mod bridge;
mod catalog;
mod corpus;
mod differential;
mod feedback;
mod preflight;
mod runner;
pub mod schemas;
mod sut;
mod targets;
pub mod tracer;

pub use bridge::{BridgeError, ExternalDecodeResult, ExternalOracle, SubprocessBridge};
pub use catalog::{CatalogError, SchemaCatalog};
pub use corpus::CorpusStore;
pub use differential::Oracle;
pub use feedback::{BugKind, RuntimeSignature};
pub use preflight::{max_violation_value, min_value, nil_element_value, preflight};
pub use runner::{random_selection, run_campaign, CampaignConfig, CampaignResult, StopReason};
pub use sut::{guard, ReferenceCodec, TargetCodec};
pub use targets::{load_targets, RoundTripTarget, TargetConfigError};
