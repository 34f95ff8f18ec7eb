//! Built-in fuzzing target schemas.
//!
//! A small bestiary of consensus-shaped structures, each built around one
//! classic SSZ trap: a four-bit bitvector with four padding bits, a lone
//! boolean, a container with a single variable field, an aggregation-bits
//! bitlist, a union with a `None` variant, and a reduced beacon state that
//! combines them all at small bounds.

use ssz::{Field, Type};
use std::sync::Arc;

/// `Bitvector[4]`: one byte, four padding bits.
pub fn bitvector_struct() -> Arc<Type> {
    Type::container(
        "BitvectorStruct",
        vec![Field::new("validation_bits", Type::bitvector(4))],
    )
}

/// A single boolean field.
pub fn boolean_struct() -> Arc<Type> {
    Type::container("BooleanStruct", vec![Field::new("val", Type::boolean())])
}

/// One variable byte-list field behind an offset word.
pub fn gap_struct() -> Arc<Type> {
    Type::container(
        "GapStruct",
        vec![Field::new("data", Type::list(Type::uint8(), 1024))],
    )
}

/// `Bitlist[2048]` aggregation bits, the null-sentinel trap.
pub fn aggregation_bits_container() -> Arc<Type> {
    Type::container(
        "AggregationBitsContainer",
        vec![Field::new("aggregation_bits", Type::bitlist(2048))],
    )
}

/// `Union[None, uint64]` wrapped with a magic word and padding, the
/// selector-zero trailing-bytes trap.
pub fn union_struct() -> Arc<Type> {
    Type::container(
        "UnionStruct",
        vec![
            Field::new("magic", Type::uint32()),
            Field::new("padding", Type::vector(Type::uint8(), 128)),
            Field::new("payload", Type::union(vec![None, Some(Type::uint64())])),
        ],
    )
}

pub fn checkpoint() -> Arc<Type> {
    Type::container(
        "Checkpoint",
        vec![
            Field::new("epoch", Type::uint64()),
            Field::new("root", Type::root()),
        ],
    )
}

pub fn fork() -> Arc<Type> {
    Type::container(
        "Fork",
        vec![
            Field::new("previous_version", Type::vector(Type::uint8(), 4)),
            Field::new("current_version", Type::vector(Type::uint8(), 4)),
            Field::new("epoch", Type::uint64()),
        ],
    )
}

pub fn beacon_block_header() -> Arc<Type> {
    Type::container(
        "BeaconBlockHeader",
        vec![
            Field::new("slot", Type::uint64()),
            Field::new("proposer_index", Type::uint64()),
            Field::new("parent_root", Type::root()),
            Field::new("state_root", Type::root()),
            Field::new("body_root", Type::root()),
        ],
    )
}

pub fn eth1_data() -> Arc<Type> {
    Type::container(
        "Eth1Data",
        vec![
            Field::new("deposit_root", Type::root()),
            Field::new("deposit_count", Type::uint64()),
            Field::new("block_hash", Type::root()),
        ],
    )
}

pub fn validator() -> Arc<Type> {
    Type::container(
        "Validator",
        vec![
            Field::new("pubkey", Type::vector(Type::uint8(), 48)),
            Field::new("withdrawal_credentials", Type::root()),
            Field::new("effective_balance", Type::uint64()),
            Field::new("slashed", Type::boolean()),
            Field::new("activation_eligibility_epoch", Type::uint64()),
            Field::new("activation_epoch", Type::uint64()),
            Field::new("exit_epoch", Type::uint64()),
            Field::new("withdrawable_epoch", Type::uint64()),
        ],
    )
}

pub fn attestation_data() -> Arc<Type> {
    Type::container(
        "AttestationData",
        vec![
            Field::new("slot", Type::uint64()),
            Field::new("index", Type::uint64()),
            Field::new("beacon_block_root", Type::root()),
            Field::new("source", checkpoint()),
            Field::new("target", checkpoint()),
        ],
    )
}

pub fn pending_attestation() -> Arc<Type> {
    Type::container(
        "PendingAttestation",
        vec![
            Field::new("aggregation_bits", Type::bitlist(2048)),
            Field::new("data", attestation_data()),
            Field::new("inclusion_delay", Type::uint64()),
            Field::new("proposer_index", Type::uint64()),
        ],
    )
}

/// A beacon state reduced to four-element bounds, structurally equivalent
/// to the real thing but small enough to fuzz densely.
pub fn beacon_state() -> Arc<Type> {
    Type::container(
        "BeaconState",
        vec![
            Field::new("genesis_time", Type::uint64()),
            Field::new("genesis_validators_root", Type::root()),
            Field::new("slot", Type::uint64()),
            Field::new("fork", fork()),
            Field::new("latest_block_header", beacon_block_header()),
            Field::new("block_roots", Type::vector(Type::root(), 4)),
            Field::new("state_roots", Type::vector(Type::root(), 4)),
            Field::new("historical_roots", Type::list(Type::root(), 4)),
            Field::new("eth1_data", eth1_data()),
            Field::new("eth1_data_votes", Type::list(eth1_data(), 4)),
            Field::new("eth1_deposit_index", Type::uint64()),
            Field::new("validators", Type::list(validator(), 4)),
            Field::new("balances", Type::list(Type::uint64(), 4)),
            Field::new("randao_mixes", Type::vector(Type::root(), 4)),
            Field::new("slashings", Type::vector(Type::uint64(), 4)),
            Field::new("previous_epoch_attestations", Type::list(pending_attestation(), 4)),
            Field::new("current_epoch_attestations", Type::list(pending_attestation(), 4)),
            Field::new("justification_bits", Type::bitvector(4)),
            Field::new("previous_justified_checkpoint", checkpoint()),
            Field::new("current_justified_checkpoint", checkpoint()),
            Field::new("finalized_checkpoint", checkpoint()),
        ],
    )
}
