// 前缀长度 -> 点分十进制掩码

/// Convert a CIDR prefix length into a dotted-decimal netmask.
///
/// Prefixes above 32 are not clamped. Each extra byte of ones is appended
/// as another octet, so `mask(40)` yields five octets.
pub fn mask(prefix: u32) -> String {
    let prefix = prefix as usize;
    let mut bytes = vec![0u8; usize::max(4, (prefix + 7) / 8)];
    for i in 0..prefix {
        bytes[i / 8] |= 0x80 >> (i % 8);
    }
    bytes.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(".")
}
