//! Request validation
//!
//! Checks applied synchronously at admission. A request that fails here never
//! becomes a job.

use thiserror::Error;

/// Longest ligand descriptor accepted at admission
pub const MAX_PAYLOAD_LEN: usize = 4096;

/// Longest input reference accepted at admission
pub const MAX_INPUT_REF_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid input reference: {0}")]
    InputRef(String),

    #[error("Invalid SMILES string: {0}")]
    Payload(String),

    #[error("Invalid callback URL: {0}")]
    CallbackUrl(String),
}

/// Domain validation for the docking parameter
pub trait PayloadValidator: Send + Sync {
    fn validate(&self, payload: &str) -> Result<(), ValidationError>;
}

/// Syntactic SMILES check
///
/// Rejects descriptors that cannot possibly parse: empty or whitespace-laden
/// strings, characters outside the SMILES alphabet, unbalanced branches and
/// unterminated bracket atoms. Chemical validity is left to the compute backend.
#[derive(Debug, Clone, Default)]
pub struct SmilesValidator;

impl PayloadValidator for SmilesValidator {
    fn validate(&self, payload: &str) -> Result<(), ValidationError> {
        if payload.is_empty() {
            return Err(ValidationError::Payload("ligand is empty".to_string()));
        }

        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ValidationError::Payload(format!(
                "ligand is longer than {} characters",
                MAX_PAYLOAD_LEN
            )));
        }

        let mut depth: usize = 0;
        let mut in_bracket = false;
        let mut has_atom = false;

        for (pos, c) in payload.chars().enumerate() {
            match c {
                '(' if !in_bracket => depth += 1,
                ')' if !in_bracket => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        ValidationError::Payload(format!("unmatched ')' at position {}", pos))
                    })?;
                }
                '[' => {
                    if in_bracket {
                        return Err(ValidationError::Payload(format!(
                            "nested '[' at position {}",
                            pos
                        )));
                    }
                    in_bracket = true;
                }
                ']' => {
                    if !in_bracket {
                        return Err(ValidationError::Payload(format!(
                            "unmatched ']' at position {}",
                            pos
                        )));
                    }
                    in_bracket = false;
                    has_atom = true;
                }
                c if c.is_ascii_alphabetic() => has_atom = true,
                c if c.is_ascii_digit() => {}
                '=' | '#' | '$' | ':' | '/' | '\\' | '.' | '+' | '-' | '@' | '%' | '*' => {}
                other => {
                    return Err(ValidationError::Payload(format!(
                        "unexpected character {:?} at position {}",
                        other, pos
                    )));
                }
            }
        }

        if in_bracket {
            return Err(ValidationError::Payload("unterminated '['".to_string()));
        }
        if depth != 0 {
            return Err(ValidationError::Payload("unbalanced parentheses".to_string()));
        }
        if !has_atom {
            return Err(ValidationError::Payload("no atoms found".to_string()));
        }

        Ok(())
    }
}

/// Checks that an input reference is a plain identifier
///
/// References end up as file names inside the structure store, so anything
/// that could escape it is rejected.
pub fn validate_input_ref(input_ref: &str) -> Result<(), ValidationError> {
    if input_ref.trim().is_empty() {
        return Err(ValidationError::InputRef("input_ref is empty".to_string()));
    }

    if input_ref.len() > MAX_INPUT_REF_LEN {
        return Err(ValidationError::InputRef(format!(
            "input_ref is longer than {} characters",
            MAX_INPUT_REF_LEN
        )));
    }

    if input_ref.starts_with('.') {
        return Err(ValidationError::InputRef(
            "input_ref cannot start with '.'".to_string(),
        ));
    }

    if let Some(c) = input_ref
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ValidationError::InputRef(format!(
            "input_ref contains {:?}",
            c
        )));
    }

    Ok(())
}
