use rand::Rng;

/// 兑换码字符集：去掉 I/L/O/0/1 等易混淆字符
const VOUCHER_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// 生成一个兑换码候选: LUCKY- 前缀 + 8 位字符。
/// 唯一性由调用方对 lottery_winners 查重保证（唯一索引兜底）。
pub fn generate_voucher_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| VOUCHER_CHARS[rng.gen_range(0..VOUCHER_CHARS.len())] as char)
        .collect();
    format!("LUCKY-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voucher_code_shape() {
        let code = generate_voucher_code();
        assert_eq!(code.len(), 14);
        assert!(code.starts_with("LUCKY-"));

        let suffix = &code["LUCKY-".len()..];
        assert!(
            suffix
                .bytes()
                .all(|b| VOUCHER_CHARS.contains(&b))
        );
    }

    #[test]
    fn test_voucher_codes_vary() {
        // 理论上可能撞车，但 31^8 的空间里连抽两次相同基本不可能
        let a = generate_voucher_code();
        let b = generate_voucher_code();
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }
}
