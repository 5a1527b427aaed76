use granbond::core::forcefield::params::MaterialSettings;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Number of tokens in a pair-style parameter string.
pub const STYLE_TOKENS: usize = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected} pair-style tokens but found {found}")]
    TokenCount { expected: usize, found: usize },

    #[error("Invalid number '{value}' for {name}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} does not accept NULL")]
    NullNotAllowed { name: &'static str },

    #[error("Invalid type bounds '{0}'. Expected 'n', '*', 'n*', '*n' or 'm*n'.")]
    InvalidBounds(String),

    #[error("Type bounds '{value}' fall outside 1..={ntypes}")]
    BoundsOutOfRange { value: String, ntypes: usize },
}

const STYLE_NAMES: [&str; STYLE_TOKENS] = [
    "kn",
    "kt",
    "gamma_n",
    "gamma_t",
    "xmu",
    "dampflag",
    "tensile strength",
    "cohesive shear strength",
    "enlarge factor",
];

fn number(name: &'static str, token: &str) -> Result<f64, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidNumber {
        name,
        value: token.to_string(),
    })
}

fn nullable(name: &'static str, token: &str) -> Result<Option<f64>, ParseError> {
    if token == "NULL" {
        Ok(None)
    } else {
        number(name, token).map(Some)
    }
}

/// Parses `"kn kt gn gt mu damp t c enlarge"` into unvalidated material settings.
///
/// `kt` and `gt` may be `NULL`; `damp` must be an integer. Range checks are left
/// to [`MaterialSettings::validate`].
pub fn parse_pair_style(text: &str) -> Result<MaterialSettings, ParseError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != STYLE_TOKENS {
        return Err(ParseError::TokenCount {
            expected: STYLE_TOKENS,
            found: tokens.len(),
        });
    }
    for (name, token) in STYLE_NAMES.iter().zip(&tokens) {
        if *token == "NULL" && !matches!(*name, "kt" | "gamma_t") {
            return Err(ParseError::NullNotAllowed { name: *name });
        }
    }

    let damping = tokens[5].parse::<i64>().map_err(|_| ParseError::InvalidNumber {
        name: STYLE_NAMES[5],
        value: tokens[5].to_string(),
    })?;

    Ok(MaterialSettings {
        normal_stiffness: number(STYLE_NAMES[0], tokens[0])?,
        tangential_stiffness: nullable(STYLE_NAMES[1], tokens[1])?,
        normal_damping: number(STYLE_NAMES[2], tokens[2])?,
        tangential_damping: nullable(STYLE_NAMES[3], tokens[3])?,
        friction_coefficient: number(STYLE_NAMES[4], tokens[4])?,
        damping,
        tensile_strength: number(STYLE_NAMES[6], tokens[6])?,
        cohesive_shear_strength: number(STYLE_NAMES[7], tokens[7])?,
        enlarge_factor: number(STYLE_NAMES[8], tokens[8])?,
    })
}

/// Parses type bounds in asterisk notation against `1..=ntypes`.
///
/// `*` selects all types, `n*` types from `n` up, `*n` types up to `n`, `m*n` the
/// closed range and a plain `n` the single type.
pub fn parse_type_bounds(text: &str, ntypes: usize) -> Result<RangeInclusive<usize>, ParseError> {
    let invalid = || ParseError::InvalidBounds(text.to_string());
    let bound = |s: &str, default: usize| -> Result<usize, ParseError> {
        if s.is_empty() {
            Ok(default)
        } else {
            s.parse().map_err(|_| invalid())
        }
    };

    let (lo, hi) = match text.split_once('*') {
        Some((lo, hi)) => (bound(lo, 1)?, bound(hi, ntypes)?),
        None => {
            let n = text.parse().map_err(|_| invalid())?;
            (n, n)
        }
    };

    if lo == 0 || hi > ntypes || lo > hi {
        return Err(ParseError::BoundsOutOfRange {
            value: text.to_string(),
            ntypes,
        });
    }
    Ok(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pair_style_reads_all_nine_tokens() {
        let settings = parse_pair_style("2e5 5e4 40 20 0.5 1 1e3 2e3 1.1").unwrap();
        assert_eq!(settings.normal_stiffness, 2e5);
        assert_eq!(settings.tangential_stiffness, Some(5e4));
        assert_eq!(settings.tangential_damping, Some(20.0));
        assert_eq!(settings.damping, 1);
        assert_eq!(settings.enlarge_factor, 1.1);
    }

    #[test]
    fn parse_pair_style_accepts_null_tangential_terms() {
        let settings = parse_pair_style("2e5 NULL 40 NULL 0.5 0 1e3 2e3 1.0").unwrap();
        assert_eq!(settings.tangential_stiffness, None);
        assert_eq!(settings.tangential_damping, None);
        let params = settings.validate().unwrap();
        assert_eq!(params.tangential_damping(), 0.0);
    }

    #[test]
    fn parse_pair_style_rejects_wrong_token_count() {
        assert_eq!(
            parse_pair_style("1 2 3"),
            Err(ParseError::TokenCount {
                expected: 9,
                found: 3
            })
        );
    }

    #[test]
    fn parse_pair_style_rejects_null_for_required_terms() {
        assert_eq!(
            parse_pair_style("NULL 1 1 1 0.5 1 1 1 1"),
            Err(ParseError::NullNotAllowed { name: "kn" })
        );
    }

    #[test]
    fn parse_pair_style_requires_integer_damping_flag() {
        assert!(matches!(
            parse_pair_style("1 1 1 1 0.5 0.5 1 1 1"),
            Err(ParseError::InvalidNumber {
                name: "dampflag",
                ..
            })
        ));
    }

    #[test]
    fn parse_type_bounds_supports_asterisk_forms() {
        assert_eq!(parse_type_bounds("*", 3), Ok(1..=3));
        assert_eq!(parse_type_bounds("2*", 3), Ok(2..=3));
        assert_eq!(parse_type_bounds("*2", 3), Ok(1..=2));
        assert_eq!(parse_type_bounds("1*2", 3), Ok(1..=2));
        assert_eq!(parse_type_bounds("3", 3), Ok(3..=3));
    }

    #[test]
    fn parse_type_bounds_rejects_out_of_range_and_garbage() {
        assert!(matches!(
            parse_type_bounds("0", 3),
            Err(ParseError::BoundsOutOfRange { .. })
        ));
        assert!(matches!(
            parse_type_bounds("2*5", 3),
            Err(ParseError::BoundsOutOfRange { .. })
        ));
        assert_eq!(
            parse_type_bounds("a*b", 3),
            Err(ParseError::InvalidBounds("a*b".to_string()))
        );
    }
}
