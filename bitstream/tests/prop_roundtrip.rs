use bitstream::{BitReader, BitWriter, CompressionModel};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Bit(bool),
    Bits { bits: u8, value: u64 },
    Raw { bits: u8, value: u32 },
    PackedUInt(u32),
    PackedInt(i32),
    IntDelta { value: i32, baseline: i32 },
    UIntDelta { value: u32, baseline: u32 },
    Align(u8),
}

fn mask_value(bits: u8, value: u64) -> u64 {
    if bits >= 64 {
        value
    } else {
        let mask = (1u64 << bits) - 1;
        value & mask
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Bit),
        (1u8..=64, any::<u64>()).prop_map(|(bits, value)| Op::Bits {
            bits,
            value: mask_value(bits, value),
        }),
        (1u8..=32, any::<u32>()).prop_map(|(bits, value)| Op::Raw {
            bits,
            value: mask_value(bits, u64::from(value)) as u32,
        }),
        any::<u32>().prop_map(Op::PackedUInt),
        any::<i32>().prop_map(Op::PackedInt),
        (any::<i32>(), any::<i32>()).prop_map(|(value, baseline)| Op::IntDelta { value, baseline }),
        (any::<u32>(), any::<u32>())
            .prop_map(|(value, baseline)| Op::UIntDelta { value, baseline }),
        prop_oneof![Just(8u8), Just(32u8)].prop_map(Op::Align),
    ]
}

fn write_op(writer: &mut BitWriter, op: &Op, model: &CompressionModel) {
    match op {
        Op::Bit(b) => writer.write_bool(*b),
        Op::Bits { bits, value } => writer.write_bits(*value, *bits as usize).unwrap(),
        Op::Raw { bits, value } => writer.write_raw_bits(*value, *bits),
        Op::PackedUInt(v) => writer.write_packed_uint(*v, model),
        Op::PackedInt(v) => writer.write_packed_int(*v, model),
        Op::IntDelta { value, baseline } => writer.write_packed_int_delta(*value, *baseline, model),
        Op::UIntDelta { value, baseline } => {
            writer.write_packed_uint_delta(*value, *baseline, model);
        }
        Op::Align(bits) => writer.align_to(*bits as usize),
    }
}

proptest! {
    #[test]
    fn prop_roundtrip_ops(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let model = CompressionModel::default();
        let mut writer = BitWriter::new();
        for op in &ops {
            write_op(&mut writer, op, &model);
        }
        prop_assert!(!writer.has_failed_writes());

        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);

        for op in &ops {
            match op {
                Op::Bit(b) => {
                    prop_assert_eq!(reader.read_bool().unwrap(), *b);
                }
                Op::Bits { bits, value } => {
                    prop_assert_eq!(reader.read_bits(*bits as usize).unwrap(), *value);
                }
                Op::Raw { bits, value } => {
                    prop_assert_eq!(reader.read_raw_bits(*bits).unwrap(), *value);
                }
                Op::PackedUInt(v) => {
                    prop_assert_eq!(reader.read_packed_uint(&model).unwrap(), *v);
                }
                Op::PackedInt(v) => {
                    prop_assert_eq!(reader.read_packed_int(&model).unwrap(), *v);
                }
                Op::IntDelta { value, baseline } => {
                    prop_assert_eq!(
                        reader.read_packed_int_delta(*baseline, &model).unwrap(),
                        *value
                    );
                }
                Op::UIntDelta { value, baseline } => {
                    prop_assert_eq!(
                        reader.read_packed_uint_delta(*baseline, &model).unwrap(),
                        *value
                    );
                }
                Op::Align(bits) => {
                    reader.align_to(*bits as usize).unwrap();
                }
            }
        }
    }

    #[test]
    fn prop_restore_is_bit_identical(
        prefix in prop::collection::vec(op_strategy(), 0..16),
        suffix in prop::collection::vec(op_strategy(), 1..32),
        capacity in 1usize..64,
    ) {
        let model = CompressionModel::default();
        let mut writer = BitWriter::with_capacity(capacity);
        for op in &prefix {
            write_op(&mut writer, op, &model);
        }
        let snapshot = writer.clone();
        let state = writer.state();

        for op in &suffix {
            write_op(&mut writer, op, &model);
        }
        writer.restore(state);
        prop_assert_eq!(writer, snapshot);
    }

    #[test]
    fn prop_encoded_bits_matches_written(value in any::<u32>()) {
        let model = CompressionModel::default();
        let mut writer = BitWriter::new();
        writer.write_packed_uint(value, &model);
        prop_assert_eq!(writer.length_in_bits(), model.encoded_bits(value));
    }
}
