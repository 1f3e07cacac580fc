//! 字符串工具模块
//! 提供字符串处理相关的工具函数

/// 缩短地址用于展示：`tz1VSUr8...8Cjcjb`
pub fn shorten_address(address: &str) -> String {
    if address.len() > 16 {
        format!("{}...{}", &address[..8], &address[address.len() - 6..])
    } else {
        address.to_string()
    }
}

/// 检查字符串是否为空或只包含空白字符
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
