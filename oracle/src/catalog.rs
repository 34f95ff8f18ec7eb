//! The schema catalog: the host-facing boundary of the core.
//!
//! Hosts address schemas by id. The catalog answers the three per-iteration
//! questions: judge these bytes (`run`), draw candidate bytes for this
//! selection (`sample`), and list the bucket space with advisory weights
//! (`buckets`).

use crate::differential::Oracle;
use crate::feedback::RuntimeSignature;
use crate::schemas;
use crate::sut::TargetCodec;
use domains::{analyze, bucket_advisories, BucketAdvice, SelectionMatrix};
use rand::Rng;
use sampler::{concretize, is_canonical, mutate, SampleError};
use ssz::{EncodeError, Type};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Returned by catalog entry points.
#[derive(Debug, PartialEq, Clone)]
pub enum CatalogError {
    UnknownSchema(String),
    Sample(SampleError),
    Encode(EncodeError),
}

impl From<SampleError> for CatalogError {
    fn from(err: SampleError) -> Self {
        CatalogError::Sample(err)
    }
}

impl From<EncodeError> for CatalogError {
    fn from(err: EncodeError) -> Self {
        CatalogError::Encode(err)
    }
}

/// A named, immutable map of fuzzing target schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: BTreeMap<String, Arc<Type>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of built-in targets.
    pub fn built_in() -> Self {
        let mut catalog = Self::new();
        catalog.insert("BitvectorStruct", schemas::bitvector_struct());
        catalog.insert("BooleanStruct", schemas::boolean_struct());
        catalog.insert("GapStruct", schemas::gap_struct());
        catalog.insert("AggregationBitsContainer", schemas::aggregation_bits_container());
        catalog.insert("UnionStruct", schemas::union_struct());
        catalog.insert("Checkpoint", schemas::checkpoint());
        catalog.insert("PendingAttestation", schemas::pending_attestation());
        catalog.insert("BeaconState", schemas::beacon_state());
        catalog
    }

    pub fn insert<S: Into<String>>(&mut self, id: S, schema: Arc<Type>) {
        self.schemas.insert(id.into(), schema);
    }

    pub fn get(&self, id: &str) -> Result<&Arc<Type>, CatalogError> {
        self.schemas
            .get(id)
            .ok_or_else(|| CatalogError::UnknownSchema(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Judges raw candidate bytes against the named schema.
    pub fn run<T: TargetCodec>(
        &self,
        oracle: &Oracle<T>,
        schema_id: &str,
        bytes: &[u8],
    ) -> Result<RuntimeSignature, CatalogError> {
        let schema = self.get(schema_id)?;
        Ok(oracle.execute(bytes, schema))
    }

    /// Draws candidate bytes for a bucket selection. The flag reports
    /// whether the bytes are a canonical encoding.
    pub fn sample<R: Rng>(
        &self,
        schema_id: &str,
        matrix: &SelectionMatrix,
        rng: &mut R,
    ) -> Result<(Vec<u8>, bool), CatalogError> {
        let schema = self.get(schema_id)?;
        let domains = analyze(schema);
        let (value, plan) = concretize(schema, &domains, matrix, rng)?;
        let canonical = is_canonical(&value, schema, &plan);
        let bytes = ssz::encode(&value, schema)?;
        Ok((mutate(&bytes, &plan, schema, rng), canonical))
    }

    /// The bucket space of the named schema, with advisory prior weights.
    pub fn buckets(&self, schema_id: &str) -> Result<Vec<BucketAdvice>, CatalogError> {
        let schema = self.get(schema_id)?;
        Ok(bucket_advisories(&analyze(schema)))
    }
}
