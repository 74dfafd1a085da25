/// Refresh token cookie transport
use crate::config::Environment;
use axum_extra::extract::SignedCookieJar;
use ::cookie::{Cookie, SameSite};

pub const SESSION_COOKIE_NAME: &str = "session";
/// Matches the refresh token lifetime
const SESSION_MAX_AGE_DAYS: i64 = 7;

/// Cookie attributes that differ between environments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
    pub partitioned: bool,
}

impl CookiePolicy {
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_production() {
            Self {
                secure: true,
                same_site: SameSite::None,
                partitioned: true,
            }
        } else {
            Self {
                secure: false,
                same_site: SameSite::Lax,
                partitioned: false,
            }
        }
    }

    fn apply(&self, name: &'static str, value: String) -> ::cookie::CookieBuilder<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .partitioned(self.partitioned)
            .path("/")
    }

    pub fn session_cookie(&self, refresh_token: &str) -> Cookie<'static> {
        self.apply(SESSION_COOKIE_NAME, refresh_token.to_string())
            .max_age(time::Duration::days(SESSION_MAX_AGE_DAYS))
            .build()
    }

    /// Cookie identifying the session cookie for removal
    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.apply(SESSION_COOKIE_NAME, String::new()).build()
    }
}

/// The verified refresh token, if the signed cookie is present and intact
pub fn read_refresh_cookie(jar: &SignedCookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

pub fn set_refresh_cookie(
    jar: SignedCookieJar,
    policy: &CookiePolicy,
    refresh_token: &str,
) -> SignedCookieJar {
    jar.add(policy.session_cookie(refresh_token))
}

pub fn delete_refresh_cookie(jar: SignedCookieJar, policy: &CookiePolicy) -> SignedCookieJar {
    jar.remove(policy.removal_cookie())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    fn jar() -> SignedCookieJar {
        SignedCookieJar::new(Key::from(&[7u8; 64]))
    }

    #[test]
    fn test_development_policy() {
        let policy = CookiePolicy::for_environment(Environment::Development);
        let cookie = policy.session_cookie("token");

        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn test_production_policy() {
        let policy = CookiePolicy::for_environment(Environment::Production);
        let cookie = policy.session_cookie("token");

        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.partitioned(), Some(true));
    }

    #[test]
    fn test_set_then_read() {
        let policy = CookiePolicy::for_environment(Environment::Development);
        let jar = set_refresh_cookie(jar(), &policy, "refresh-token");
        assert_eq!(read_refresh_cookie(&jar).as_deref(), Some("refresh-token"));

        let jar = delete_refresh_cookie(jar, &policy);
        assert!(read_refresh_cookie(&jar).is_none());
    }

    #[test]
    fn test_empty_jar() {
        assert!(read_refresh_cookie(&jar()).is_none());
    }
}
