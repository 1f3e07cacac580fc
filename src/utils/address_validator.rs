//! 地址验证模块
//!
//! 手动输入地址时的格式校验，按链区分规则

use crate::domain::network_profile::ChainId;

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 验证地址格式
    pub fn validate(chain: ChainId, address: &str) -> bool {
        match chain {
            ChainId::Tezos => Self::validate_tezos_address(address),
            ChainId::Sui => Self::validate_sui_address(address),
        }
    }

    /// 验证Tezos地址（tz1/tz2/tz3 隐式账户或 KT1 合约，Base58 编码，
    /// 36 个字符）
    fn validate_tezos_address(address: &str) -> bool {
        let valid_prefix = address.starts_with("tz1")
            || address.starts_with("tz2")
            || address.starts_with("tz3")
            || address.starts_with("KT1");

        if !valid_prefix || address.len() != 36 {
            return false;
        }

        // Base58 字符集校验
        bs58::decode(address).into_vec().is_ok()
    }

    /// 验证Sui地址（0x 前缀的十六进制，至少 42 个字符）
    fn validate_sui_address(address: &str) -> bool {
        if !address.starts_with("0x") || address.len() < 42 {
            return false;
        }

        address[2..].chars().all(|c| c.is_ascii_hexdigit())
    }
}
