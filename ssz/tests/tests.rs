use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ssz::{
    decode, encode, hash_tree_root, proof_tree, select_proof_gindices, DecodeError, EncodeError,
    Field, Type, Value,
};
use std::sync::Arc;

fn list_u8(max: usize) -> Arc<Type> {
    Type::list(Type::uint8(), max)
}

mod round_trip {
    use super::*;

    fn round_trip(cases: Vec<(Arc<Type>, Value)>) {
        for (ty, value) in cases {
            let encoded = encode(&value, &ty).unwrap();
            assert_eq!(
                decode(&encoded, &ty),
                Ok(value),
                "schema {}",
                ty.describe()
            );
        }
    }

    #[test]
    fn scalars() {
        round_trip(vec![
            (Type::uint8(), Value::Uint8(255)),
            (Type::uint16(), Value::Uint16(65535)),
            (Type::uint32(), Value::Uint32(0)),
            (Type::uint64(), Value::Uint64(u64::MAX)),
            (Type::boolean(), Value::Bool(true)),
            (Type::boolean(), Value::Bool(false)),
        ]);
    }

    #[test]
    fn bitfields() {
        round_trip(vec![
            (Type::bitvector(4), Value::Bitvector(vec![0x0F])),
            (Type::bitvector(9), Value::Bitvector(vec![0xFF, 0x01])),
            (Type::bitlist(8), Value::Bitlist(vec![0x01])),
            (Type::bitlist(8), Value::Bitlist(vec![0xAB, 0x01])),
        ]);
    }

    #[test]
    fn sequences() {
        round_trip(vec![
            (list_u8(4), Value::List(vec![])),
            (
                list_u8(4),
                Value::List(vec![Value::Uint8(1), Value::Uint8(2)]),
            ),
            (
                Type::vector(Type::uint16(), 3),
                Value::Vector(vec![
                    Value::Uint16(1),
                    Value::Uint16(2),
                    Value::Uint16(3),
                ]),
            ),
            (
                Type::list(list_u8(4), 4),
                Value::List(vec![
                    Value::List(vec![]),
                    Value::List(vec![Value::Uint8(9)]),
                ]),
            ),
        ]);
    }

    #[test]
    fn containers() {
        let fixed = Type::container(
            "FixedLen",
            vec![
                Field::new("a", Type::uint16()),
                Field::new("b", Type::uint64()),
                Field::new("c", Type::uint32()),
            ],
        );
        let variable = Type::container(
            "VariableLen",
            vec![
                Field::new("a", Type::uint16()),
                Field::new("b", Type::list(Type::uint16(), 8)),
                Field::new("c", Type::uint32()),
            ],
        );
        round_trip(vec![
            (
                fixed,
                Value::Container(vec![
                    Value::Uint16(1),
                    Value::Uint64(0),
                    Value::Uint32(1),
                ]),
            ),
            (
                variable.clone(),
                Value::Container(vec![
                    Value::Uint16(1),
                    Value::List(vec![]),
                    Value::Uint32(1),
                ]),
            ),
            (
                variable,
                Value::Container(vec![
                    Value::Uint16(1),
                    Value::List(vec![Value::Uint16(0), Value::Uint16(1), Value::Uint16(2)]),
                    Value::Uint32(1),
                ]),
            ),
        ]);
    }

    /// Draws a random valid value of `ty`.
    fn arbitrary(ty: &Type, rng: &mut StdRng) -> Value {
        match ty {
            Type::Uint8 => Value::Uint8(rng.gen()),
            Type::Uint16 => Value::Uint16(rng.gen()),
            Type::Uint32 => Value::Uint32(rng.gen()),
            Type::Uint64 => Value::Uint64(rng.gen()),
            Type::Bool => Value::Bool(rng.gen()),
            Type::Vector { elem, len } => {
                Value::Vector((0..*len).map(|_| arbitrary(elem, rng)).collect())
            }
            Type::List { elem, max } => {
                let len = rng.gen_range(0..=*max.min(&8));
                Value::List((0..len).map(|_| arbitrary(elem, rng)).collect())
            }
            Type::Bitvector { bits } => {
                let mut bytes = vec![0u8; (bits + 7) / 8];
                rng.fill(bytes.as_mut_slice());
                ssz::clear_padding_bits(&mut bytes, *bits);
                Value::Bitvector(bytes)
            }
            Type::Bitlist { max_bits } => {
                let bits = rng.gen_range(0..=*max_bits.min(&64));
                let mut bytes = vec![0u8; bits / 8 + 1];
                rng.fill(bytes.as_mut_slice());
                let last = bytes.last_mut().unwrap();
                *last &= (1u8 << (bits % 8)) - 1;
                *last |= 1 << (bits % 8);
                Value::Bitlist(bytes)
            }
            Type::Container { fields, .. } => Value::Container(
                fields.iter().map(|f| arbitrary(&f.ty, rng)).collect(),
            ),
            Type::Union { variants } => {
                let selector = rng.gen_range(0..variants.len()) as u8;
                Value::Union {
                    selector,
                    value: variants[selector as usize]
                        .as_ref()
                        .map(|v| Box::new(arbitrary(v, rng))),
                }
            }
        }
    }

    fn random_schemas() -> Vec<Arc<Type>> {
        let checkpoint = Type::container(
            "Checkpoint",
            vec![
                Field::new("epoch", Type::uint64()),
                Field::new("root", Type::root()),
            ],
        );
        vec![
            Type::uint64(),
            Type::bitvector(12),
            Type::bitlist(64),
            Type::list(Type::uint64(), 8),
            Type::vector(checkpoint.clone(), 2),
            Type::list(Type::list(Type::uint16(), 4), 4),
            Type::container(
                "Everything",
                vec![
                    Field::new("flag", Type::boolean()),
                    Field::new("bits", Type::bitvector(4)),
                    Field::new("items", Type::list(Type::uint32(), 8)),
                    Field::new("tail_bits", Type::bitlist(16)),
                    Field::new("point", checkpoint),
                    Field::new("choice", Type::union(vec![None, Some(Type::uint64())])),
                ],
            ),
        ]
    }

    #[test]
    fn random_values_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        for ty in random_schemas() {
            for _ in 0..64 {
                let value = arbitrary(&ty, &mut rng);
                let encoded = encode(&value, &ty).unwrap();
                let decoded = decode(&encoded, &ty).unwrap();
                assert_eq!(decoded, value, "schema {}", ty.describe());
                // Re-encoding an accepted input is byte-identical.
                assert_eq!(encode(&decoded, &ty).unwrap(), encoded);
            }
        }
    }

    #[test]
    fn random_roots_survive_round_trip() {
        let mut rng = StdRng::seed_from_u64(99);
        for ty in random_schemas() {
            for _ in 0..32 {
                let value = arbitrary(&ty, &mut rng);
                let encoded = encode(&value, &ty).unwrap();
                let decoded = decode(&encoded, &ty).unwrap();
                assert_eq!(
                    hash_tree_root(&value, &ty).unwrap(),
                    hash_tree_root(&decoded, &ty).unwrap(),
                    "schema {}",
                    ty.describe()
                );
            }
        }
    }

    #[test]
    fn canonicalize_preserves_roots_of_canonical_values() {
        let mut rng = StdRng::seed_from_u64(7);
        for ty in random_schemas() {
            for _ in 0..32 {
                let value = arbitrary(&ty, &mut rng);
                let canonical = value.canonicalize(&ty);
                assert_eq!(canonical, value, "schema {}", ty.describe());
                assert_eq!(
                    hash_tree_root(&canonical, &ty).unwrap(),
                    hash_tree_root(&value, &ty).unwrap()
                );
            }
        }
    }

    #[test]
    fn random_multiproofs_verify() {
        let mut rng = StdRng::seed_from_u64(13);
        for ty in random_schemas() {
            for _ in 0..8 {
                let value = arbitrary(&ty, &mut rng);
                let tree = proof_tree(&value, &ty).unwrap();
                let indices = select_proof_gindices(&tree, 2);
                let proof = tree.prove_multi(&indices).unwrap();
                assert_eq!(proof.verify(tree.root()), Ok(true));
            }
        }
    }
}

mod boundaries {
    use super::*;

    #[test]
    fn zero_max_bitlist_accepts_only_the_sentinel_byte() {
        let ty = Type::bitlist(0);
        assert_eq!(decode(&[0x01], &ty), Ok(Value::Bitlist(vec![0x01])));
        for byte in [0x00u8, 0x02, 0x03, 0x80, 0xFF] {
            assert!(decode(&[byte], &ty).is_err(), "byte {:#x}", byte);
        }
        assert!(decode(&[0x01, 0x01], &ty).is_err());
    }

    #[test]
    fn bitvector4_high_nibble_rejected() {
        let ty = Type::bitvector(4);
        for high in 1..=0x0Fu8 {
            assert_eq!(
                decode(&[(high << 4) | 0x0F], &ty),
                Err(DecodeError::BitvectorDirtyPadding)
            );
        }
    }

    #[test]
    fn union_none_selector_with_tail_rejected() {
        let ty = Type::union(vec![None, Some(Type::uint64())]);
        assert_eq!(
            decode(&[0, 1], &ty),
            Err(DecodeError::UnionTrailing { extra: 1 })
        );
    }

    #[test]
    fn list_one_past_max_fails_encode() {
        let ty = list_u8(4);
        let value = Value::List(vec![Value::Uint8(0); 5]);
        assert_eq!(
            encode(&value, &ty),
            Err(EncodeError::LengthExceedsMax { len: 5, max: 4 })
        );
    }

    #[test]
    fn fixed_container_trailing_byte_rejected() {
        let ty = Type::container(
            "FixedLen",
            vec![
                Field::new("a", Type::uint16()),
                Field::new("b", Type::uint64()),
            ],
        );
        let value = Value::Container(vec![Value::Uint16(1), Value::Uint64(2)]);
        let mut bytes = encode(&value, &ty).unwrap();
        bytes.push(0);
        assert_eq!(
            decode(&bytes, &ty),
            Err(DecodeError::TrailingBytes {
                len: 11,
                expected: 10
            })
        );
    }
}

mod scenarios {
    use super::*;

    fn gap_schema() -> Arc<Type> {
        Type::container("GapStruct", vec![Field::new("data", list_u8(4))])
    }

    #[test]
    fn dirty_bitvector_byte() {
        let ty = Type::bitvector(4);
        assert_eq!(decode(&[0xF1], &ty), Err(DecodeError::BitvectorDirtyPadding));

        // The canonicalised value hashes differently from the raw byte.
        let raw = Value::Bitvector(vec![0xF1]);
        let canonical = raw.canonicalize(&ty);
        assert_eq!(canonical, Value::Bitvector(vec![0x01]));
        assert_ne!(
            hash_tree_root(&raw, &ty).unwrap(),
            hash_tree_root(&canonical, &ty).unwrap()
        );
    }

    #[test]
    fn non_canonical_bool_byte() {
        assert_eq!(
            decode(&[0x02], &Type::Bool),
            Err(DecodeError::BoolNonCanonical(0x02))
        );
    }

    #[test]
    fn canonical_offset_container() {
        let bytes = [0x04, 0, 0, 0, 0, 0, 0, 0];
        let decoded = decode(&bytes, &gap_schema()).unwrap();
        assert_eq!(
            decoded,
            Value::Container(vec![Value::List(vec![Value::Uint8(0); 4])])
        );
        assert_eq!(encode(&decoded, &gap_schema()).unwrap(), bytes);
    }

    #[test]
    fn skipped_byte_offset_rejected() {
        let bytes = [0x05, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            decode(&bytes, &gap_schema()),
            Err(DecodeError::FirstOffsetMismatch(5))
        );
    }

    #[test]
    fn two_list_container_offsets() {
        let ty = Type::container(
            "TwoLists",
            vec![
                Field::new("a", list_u8(4)),
                Field::new("b", list_u8(4)),
            ],
        );
        // Offsets [8, 10], payload 00 00 00: a is two bytes, b is one.
        let bytes = [8, 0, 0, 0, 10, 0, 0, 0, 0, 0, 0];
        let decoded = decode(&bytes, &ty).unwrap();
        assert_eq!(
            decoded,
            Value::Container(vec![
                Value::List(vec![Value::Uint8(0); 2]),
                Value::List(vec![Value::Uint8(0); 1]),
            ])
        );
        assert_eq!(encode(&decoded, &ty).unwrap(), bytes);
    }

    #[test]
    fn sentinel_free_bitlist_rejected() {
        let ty = Type::bitlist(2048);
        assert_eq!(decode(&[0x00], &ty), Err(DecodeError::BitlistMissingSentinel));
    }

    #[test]
    fn union_none_with_payload_rejected() {
        let ty = Type::union(vec![None, Some(Type::uint64())]);
        assert_eq!(
            decode(&[0x00, 0xDE, 0xAD, 0xBE, 0xEF], &ty),
            Err(DecodeError::UnionTrailing { extra: 4 })
        );
    }

    #[test]
    fn all_variable_container_accepts_matching_first_offset() {
        // Offset words are themselves part of the fixed section, so the first
        // offset of a two-list container is 8, never 0.
        let ty = Type::container(
            "TwoLists",
            vec![
                Field::new("a", list_u8(4)),
                Field::new("b", list_u8(4)),
            ],
        );
        let bytes = [0u8, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            decode(&bytes, &ty),
            Err(DecodeError::FirstOffsetMismatch(0))
        );

        let empty = [8u8, 0, 0, 0, 8, 0, 0, 0];
        assert_eq!(
            decode(&empty, &ty).unwrap(),
            Value::Container(vec![Value::List(vec![]), Value::List(vec![])])
        );
    }
}
