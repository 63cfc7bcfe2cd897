//! 路由哈希
//!
//! 与 Guava 的 `Hashing.murmur3_128(seed)` + `Hashing.consistentHash` 结果一致，
//! 这样与旧版路由服务共存时同一个 key 会落到同一个分区。

use std::io::Cursor;

const LCG_MULTIPLIER: u64 = 2_862_933_555_777_941_757;

/// Murmur3 x64-128 哈希各部分 UTF-8 字节的拼接，取低 64 位
pub fn hash_parts(seed: u32, parts: &[&str]) -> std::io::Result<u64> {
    let bytes: Vec<u8> = parts.iter().flat_map(|p| p.as_bytes()).copied().collect();
    let hash = murmur3::murmur3_x64_128(&mut Cursor::new(bytes), seed)?;
    Ok(hash as u64)
}

/// 线性同余跳跃一致性哈希，返回 `[0, buckets)` 内的分区
///
/// 分区数从 n 增加到 n+1 时，只有约 1/(n+1) 的 key 会移动，且只会移动到新分区。
pub fn consistent_hash(input: u64, buckets: usize) -> usize {
    let buckets = i32::try_from(buckets).unwrap_or(i32::MAX);
    let mut state = input;
    let mut candidate: i32 = 0;

    loop {
        state = state.wrapping_mul(LCG_MULTIPLIER).wrapping_add(1);
        // 与 Java int 运算一致，0x7fff_ffff + 1 回绕为负数
        let next_double = ((state >> 33) as i32).wrapping_add(1) as f64 / (1u64 << 31) as f64;
        let next = ((candidate + 1) as f64 / next_double) as i32;

        if next >= 0 && next < buckets {
            candidate = next;
        } else {
            return candidate as usize;
        }
    }
}
