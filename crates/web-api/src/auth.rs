//! 能力令牌的传递
//!
//! 令牌放在 `x-auth-token` Cookie 中，房间ID走查询参数。这里只负责从请求里取出
//! 原始字符串，是否有效交给应用层的访问控制判断。

use application::RoomCredentials;
use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{Cookie, SameSite};
use domain::Token;

use crate::error::ApiError;

pub const TOKEN_COOKIE: &str = "x-auth-token";

/// 从 Cookie 头中取出令牌
///
/// 多个 Cookie 头、引号包裹的值都按 RFC 6265 处理；无法解析的片段跳过。
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == TOKEN_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
}

/// 组合查询参数中的房间ID与 Cookie 中的令牌
pub fn credentials(headers: &HeaderMap, room_id: Option<String>) -> RoomCredentials {
    RoomCredentials {
        room_id,
        token: token_from_headers(headers),
    }
}

/// 加入房间后下发的 Cookie
pub fn token_cookie(token: &Token) -> Result<HeaderValue, ApiError> {
    let cookie = Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|err| ApiError::internal_server_error(format!("invalid cookie: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; x-auth-token=abc123; other=1"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_quoted_and_repeated_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("x-auth-token=\"abc123\"; lang=zh"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc123"));

        // 名字只是前缀时不算
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("x-auth-token-old=stale;  x-auth-token=fresh"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("fresh"));
    }

    #[test]
    fn test_missing_or_empty_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("x-auth-token="));
        assert_eq!(token_from_headers(&headers), None);
    }

    #[test]
    fn test_token_cookie_attributes() {
        let token = Token::parse("tok").unwrap();
        let header = token_cookie(&token).unwrap();

        let cookie = Cookie::parse(header.to_str().unwrap()).unwrap();
        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }
}
