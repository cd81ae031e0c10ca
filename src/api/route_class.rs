//! Request path classification for the edge gatekeeper.

/// Sign-in entry point.
pub const SIGN_IN_PATH: &str = "/auth/login";
pub const COMPLETE_PROFILE_PATH: &str = "/auth/complete-profile";
pub const ERROR_PATH: &str = "/auth/error";

/// Build output and public assets, served untouched.
const STATIC_PREFIXES: &[&str] = &["/_next/static/", "/_next/image", "/static/"];
const STATIC_FILES: &[&str] = &["/favicon.ico", "/robots.txt", "/sitemap.xml"];
const STATIC_EXTENSIONS: &[&str] = &[
    "svg", "png", "jpg", "jpeg", "gif", "webp", "ico", "css", "js", "map", "woff", "woff2",
    "ttf", "txt",
];

/// Reachable without a session. `/` matches exactly; the rest also match
/// anything below them.
const PUBLIC_PATHS: &[&str] = &["/", "/auth", "/api/health", "/about", "/pricing", "/contact"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    StaticAsset,
    Public,
    Protected,
}

/// Classify a request path. Static assets are checked first.
pub fn classify(path: &str) -> RouteClass {
    if is_static_asset(path) {
        RouteClass::StaticAsset
    } else if is_public(path) {
        RouteClass::Public
    } else {
        RouteClass::Protected
    }
}

fn is_static_asset(path: &str) -> bool {
    if STATIC_PREFIXES.iter().any(|p| path.starts_with(p)) || STATIC_FILES.contains(&path) {
        return true;
    }
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => STATIC_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| {
        path == *public
            || (*public != "/"
                && path
                    .strip_prefix(public)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}
