//! 请求字段校验
//!
//! 校验失败直接返回 400 响应，handler 用 `match ... return` 提前退出。

use crate::utils::response::bad_request_error;
use axum::response::Response;
use std::net::Ipv4Addr;

/// 必填文本字段：去除首尾空白后不能为空。
pub fn normalize_required(value: String, field: &str) -> Result<String, Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request_error(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

/// 烧录地址：空白视为未提供；地址内部不允许空白（会被拼进工具链参数）。
pub fn normalize_address(value: Option<String>) -> Result<Option<String>, Response> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(bad_request_error("address must not contain whitespace"));
    }
    Ok(Some(trimmed.to_string()))
}

/// 发现扫描 hint：可省略，提供时必须是 IPv4。
pub fn parse_ipv4_hint(value: Option<&str>) -> Result<Option<Ipv4Addr>, Response> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse::<Ipv4Addr>()
            .map(Some)
            .map_err(|_| bad_request_error("hint must be an IPv4 address")),
        None => Ok(None),
    }
}
