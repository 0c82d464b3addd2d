//! Subject validation and wildcard pattern matching.
//!
//! Subjects are dot-delimited elements made of `A-Z`, `0-9`, `-` and `_`
//! (lower-case letters too when lenient). Subscription patterns may also use:
//!
//! - `*` in any position, matching exactly one element
//! - `>` as the last element, matching one or more trailing elements
//! - `+` as the last element, matching zero or more trailing elements
//!
//! Matching is case-sensitive.

use crate::utils::{GmsecError, Result};

pub const SINGLE_WILDCARD: &str = "*";
pub const ONE_OR_MORE: &str = ">";
pub const ZERO_OR_MORE: &str = "+";

fn valid_char(c: char, lenient: bool) -> bool {
    c.is_ascii_uppercase()
        || c.is_ascii_digit()
        || c == '-'
        || c == '_'
        || (lenient && c.is_ascii_lowercase())
}

fn split(subject: &str) -> Result<Vec<&str>> {
    if subject.is_empty() {
        return Err(GmsecError::illegal_argument("Subject cannot be empty"));
    }
    if subject.contains("..") {
        return Err(GmsecError::illegal_argument(format!(
            "Subject '{subject}' has '..' (is it missing an element?)"
        )));
    }
    Ok(subject.split('.').collect())
}

fn check_elements(subject: &str, elements: &[&str], subscription: bool, lenient: bool) -> Result<()> {
    let last = elements.len() - 1;
    for (i, element) in elements.iter().enumerate() {
        if element.is_empty() {
            return Err(GmsecError::illegal_argument(format!(
                "Subject '{subject}' has an empty element"
            )));
        }
        if subscription && *element == SINGLE_WILDCARD {
            continue;
        }
        if subscription && i == last && (*element == ONE_OR_MORE || *element == ZERO_OR_MORE) {
            continue;
        }
        if !element.chars().all(|c| valid_char(c, lenient)) {
            return Err(GmsecError::illegal_argument(format!(
                "Subject element '{element}' of '{subject}' contains an illegal character"
            )));
        }
    }
    Ok(())
}

/// Validates a subject used to publish a message.
pub fn validate_subject(subject: &str, lenient: bool) -> Result<()> {
    let elements = split(subject)?;
    check_elements(subject, &elements, false, lenient)
}

/// Validates a subscription pattern.
pub fn validate_pattern(pattern: &str, lenient: bool) -> Result<()> {
    let elements = split(pattern)?;
    check_elements(pattern, &elements, true, lenient)
}

pub fn is_valid_subject(subject: &str, lenient: bool) -> bool {
    validate_subject(subject, lenient).is_ok()
}

pub fn is_valid_pattern(pattern: &str, lenient: bool) -> bool {
    validate_pattern(pattern, lenient).is_ok()
}

/// Returns true when `subject` matches the subscription `pattern`.
pub fn matches(subject: &str, pattern: &str) -> bool {
    if subject.is_empty() || pattern.is_empty() {
        return false;
    }
    let subject: Vec<&str> = subject.split('.').collect();
    let pattern: Vec<&str> = pattern.split('.').collect();
    matches_elements(&subject, &pattern)
}

fn matches_elements(subject: &[&str], pattern: &[&str]) -> bool {
    let mut s = 0;
    let mut p = 0;

    while s < subject.len() && p < pattern.len() {
        match pattern[p] {
            ONE_OR_MORE | ZERO_OR_MORE => return true,
            SINGLE_WILDCARD => {}
            element if element != subject[s] => return false,
            _ => {}
        }
        s += 1;
        p += 1;

        if s == subject.len() && p < pattern.len() && pattern[p] == ZERO_OR_MORE {
            return true;
        }
    }

    s == subject.len() && p == pattern.len()
}

#[cfg(test)]
mod tests;
