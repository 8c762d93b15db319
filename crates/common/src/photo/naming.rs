//! Collision-free filename assignment
//!
//! Names are assigned in discovery order: the first photo keeps its bare
//! title, later photos with the same title get a zero-padded counter.

/// Compute a filename for `base` + `ext` that `exists` does not report as taken
///
/// While `base.ext` is taken, the base is split on its last space. A positive
/// decimal suffix is incremented; anything else keeps the whole base as the
/// stem and starts counting at 1. The new base is the stem, a space and the
/// counter zero-padded to three digits. Suffixes of any length are counted
/// exactly.
pub fn resolve_filename<F>(base: &str, ext: &str, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut base = base.to_string();

    loop {
        let candidate = format!("{}.{}", base, ext);
        if !exists(&candidate) {
            return candidate;
        }

        let next = base
            .rsplit_once(' ')
            .and_then(|(stem, suffix)| next_counter(suffix).map(|n| (stem.to_string(), n)));
        let (stem, counter) = match next {
            Some(next) => next,
            None => (base.clone(), "1".to_string()),
        };
        base = format!("{} {:0>3}", stem, counter);
    }
}

/// `suffix + 1` if `suffix` is a positive decimal number, without leading zeros
fn next_counter(suffix: &str) -> Option<String> {
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = suffix.trim_start_matches('0');
    if digits.is_empty() {
        return None;
    }

    let mut out = digits.as_bytes().to_vec();
    for digit in out.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return String::from_utf8(out).ok();
        }
    }
    out.insert(0, b'1');
    String::from_utf8(out).ok()
}
