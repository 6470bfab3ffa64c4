// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Claim checks shared by the issuer and the verifier

use chrono::{DateTime, Duration, Utc};

use super::claims::JwtClaims;
use crate::error::{TokenError, VerificationFailure};

/// Which subjects a verifier accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectPolicy {
    /// The subject must be present and made of ASCII decimal digits only
    #[default]
    Numeric,
    /// Any subject, including none
    Any,
}

/// Reject a ttl that is not positive, or too short to survive second resolution
pub(crate) fn check_ttl(ttl: Option<Duration>) -> Result<(), TokenError> {
    match ttl {
        Some(ttl) if ttl <= Duration::zero() => Err(TokenError::issuance_field(
            "ttl",
            format!("ttl must be a positive duration, got {}s", ttl.num_seconds()),
        )),
        Some(ttl) if ttl < Duration::seconds(1) => Err(TokenError::issuance_field(
            "ttl",
            format!("ttl must be at least one second, got {}ms", ttl.num_milliseconds()),
        )),
        _ => Ok(()),
    }
}

/// Check `nbf` and `exp` against `now`, tolerating `leeway` seconds of clock skew
///
/// The token is valid from `nbf` inclusive until `exp` exclusive.
pub(crate) fn check_time_window(
    claims: &JwtClaims,
    now: DateTime<Utc>,
    leeway: u64,
) -> Result<(), VerificationFailure> {
    let now = now.timestamp();
    let leeway = i64::try_from(leeway).unwrap_or(i64::MAX);

    if let Some(exp) = claims.exp {
        if now >= exp.saturating_add(leeway) {
            return Err(VerificationFailure::Expired);
        }
    }
    if let Some(nbf) = claims.nbf {
        if now < nbf.saturating_sub(leeway) {
            return Err(VerificationFailure::NotYetValid);
        }
    }
    Ok(())
}

/// Apply the subject policy to a verified claim set
pub(crate) fn check_subject(claims: &JwtClaims, policy: SubjectPolicy) -> Result<(), TokenError> {
    if policy == SubjectPolicy::Any {
        return Ok(());
    }
    match claims.sub.as_deref() {
        Some(sub) if is_principal_id(sub) => Ok(()),
        Some(sub) if sub.trim().is_empty() => Err(TokenError::Malformed("subject is blank".into())),
        Some(_) => Err(TokenError::Malformed(
            "subject is not a numeric principal id".into(),
        )),
        None => Err(TokenError::Malformed("subject is missing".into())),
    }
}

/// Principal identifiers are non-empty runs of decimal digits
pub fn is_principal_id(subject: &str) -> bool {
    !subject.is_empty() && subject.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn window(nbf: Option<i64>, exp: Option<i64>) -> JwtClaims {
        JwtClaims {
            nbf,
            exp,
            ..JwtClaims::default()
        }
    }

    #[test]
    fn test_ttl_must_be_positive() {
        assert!(check_ttl(None).is_ok());
        assert!(check_ttl(Some(Duration::seconds(1))).is_ok());
        assert!(matches!(
            check_ttl(Some(Duration::zero())),
            Err(TokenError::IssuanceFailed {
                field: Some("ttl"),
                ..
            })
        ));
        assert!(check_ttl(Some(Duration::seconds(-1))).is_err());
    }

    #[test]
    fn test_sub_second_ttl_is_rejected() {
        assert!(matches!(
            check_ttl(Some(Duration::milliseconds(999))),
            Err(TokenError::IssuanceFailed {
                field: Some("ttl"),
                ..
            })
        ));
        assert!(check_ttl(Some(Duration::milliseconds(1000))).is_ok());
    }

    #[test]
    fn test_expiration_is_exclusive() {
        let claims = window(None, Some(100));
        assert!(check_time_window(&claims, at(99), 0).is_ok());
        assert_eq!(
            check_time_window(&claims, at(100), 0),
            Err(VerificationFailure::Expired)
        );
        assert!(check_time_window(&claims, at(104), 5).is_ok());
    }

    #[test]
    fn test_not_before_is_inclusive() {
        let claims = window(Some(100), None);
        assert_eq!(
            check_time_window(&claims, at(99), 0),
            Err(VerificationFailure::NotYetValid)
        );
        assert!(check_time_window(&claims, at(100), 0).is_ok());
        assert!(check_time_window(&claims, at(98), 2).is_ok());
    }

    #[test]
    fn test_no_window_never_expires() {
        assert!(check_time_window(&window(None, None), at(i64::from(i32::MAX)), 0).is_ok());
    }

    #[test]
    fn test_principal_id_shape() {
        assert!(is_principal_id("0"));
        assert!(is_principal_id("1234567890"));
        assert!(!is_principal_id(""));
        assert!(!is_principal_id(" 12"));
        assert!(!is_principal_id("12a"));
        assert!(!is_principal_id("-1"));
        assert!(!is_principal_id("١٢"));
    }

    #[test]
    fn test_subject_policy() {
        let mut claims = JwtClaims::default();
        assert!(matches!(
            check_subject(&claims, SubjectPolicy::Numeric),
            Err(TokenError::Malformed(_))
        ));
        assert!(check_subject(&claims, SubjectPolicy::Any).is_ok());

        claims.sub = Some("   ".into());
        assert!(matches!(
            check_subject(&claims, SubjectPolicy::Numeric),
            Err(TokenError::Malformed(_))
        ));

        claims.sub = Some("alice".into());
        assert!(check_subject(&claims, SubjectPolicy::Numeric).is_err());
        assert!(check_subject(&claims, SubjectPolicy::Any).is_ok());

        claims.sub = Some("2048".into());
        assert!(check_subject(&claims, SubjectPolicy::Numeric).is_ok());
    }
}
