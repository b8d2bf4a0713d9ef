#![no_main]

use bitstream::{BitReader, CompressionModel};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let model = CompressionModel::default();
    let mut reader = BitReader::new(data);
    let mut idx = 0usize;

    // Input bytes drive a bounded sequence of reads over the same input.
    while idx < data.len() && idx < 1024 {
        let op = data[idx] % 7;
        idx += 1;

        match op {
            0 => {
                let _ = reader.read_bool();
            }
            1 => {
                let bits = usize::from(data[idx - 1] % 65);
                let _ = reader.read_bits(bits);
            }
            2 => {
                let _ = reader.align_to(32);
            }
            3 => {
                let _ = reader.read_packed_uint(&model);
            }
            4 => {
                let _ = reader.read_packed_int(&model);
            }
            5 => {
                let _ = reader.read_packed_uint_delta(u32::from(data[idx - 1]), &model);
            }
            _ => {
                let _ = reader.read_packed_int_delta(-i32::from(data[idx - 1]), &model);
            }
        }
    }
});
