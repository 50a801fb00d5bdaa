//! Leaf utilities over `Event` and `Response`.
//!
//! These read the request, the working URL and the context, and write the
//! response shell. None of them touch the dispatch algorithm.

pub mod auth;
pub mod base;
pub mod cookie;
pub mod cors;
pub mod middleware;
pub mod proxy;
pub mod request;
pub mod response;
pub mod validate;

pub use self::auth::{basic_auth, BasicAuthOptions};
pub use self::base::with_base;
pub use self::cookie::{
    delete_cookie, get_cookie, parse_cookies, set_cookie, CookieOptions, SameSite,
};
pub use self::cors::{
    append_cors_headers, append_cors_preflight_headers, cors, handle_cors, is_cors_origin_allowed,
    is_preflight_request, AllowList, AllowOrigin, CorsOptions, OriginRule,
};
pub use self::middleware::{on_error, on_request, on_response};
pub use self::proxy::{
    fetch_with_event, get_proxy_request_headers, proxy_request, CookieRewrite, ProxyOptions,
};
pub use self::request::{
    assert_method, get_query, get_query_all, get_request_host, get_request_protocol,
    get_router_param, get_router_params, is_method,
};
pub use self::response::{
    append_response_header, get_response_status, get_response_status_text, no_content, redirect,
    remove_response_header, set_response_header, set_response_status,
};
pub use self::validate::ValidatedRequest;
