//! String helpers: random tokens, escaping, byte formatting, the base64url
//! codec, and URL normalization.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::Rng;
use regex::Regex;

// ============================================================================
// Random generation
// ============================================================================

/// Generates a pseudo-random string of hexadecimal characters.
pub fn random_hex(size: usize) -> String {
    let byte_size = size.div_ceil(2);
    let mut bytes = vec![0u8; byte_size];
    rand::thread_rng().fill(&mut bytes[..]);

    let mut out = hex::encode(bytes);
    out.truncate(size);
    out
}

/// Generates a pseudo-random string of decimal digits.
pub fn random_digits(digits: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..digits)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Generate a string that's random, but usually pronounceable.
/// Used to generate initial passwords.
pub fn random_name(len: usize) -> String {
    if len == 0 {
        return String::new();
    }

    let cons = [
        "b", "bl", "br", "c", "ch", "cl", "cr", "d", "dr", "f", "fl", "fr", "g", "gh", "gl", "gr",
        "h", "j", "k", "kh", "kl", "kr", "l", "m", "n", "p", "ph", "pl", "pr", "qu", "r", "rh",
        "s", "sc", "sh", "sm", "sp", "st", "t", "th", "tr", "v", "w", "wh", "x", "z", "zh",
    ];
    let midcons = [
        "ck", "ct", "gn", "ld", "lf", "lm", "lt", "mb", "mm", "mn", "mp", "nd", "ng", "nk", "nt",
        "rn", "rp", "rt",
    ];
    let noend = [
        "bl", "br", "cl", "cr", "dr", "fl", "fr", "gl", "gr", "kh", "kl", "kr", "mn", "pl", "pr",
        "rh", "tr", "qu", "wh", "q",
    ];

    let mut rng = rand::thread_rng();

    loop {
        let mut vowels = vec![
            "a", "a", "ai", "au", "e", "e", "e", "ee", "ea", "i", "ie", "o", "ou", "u",
        ];
        if rng.gen_range(0..6) == 4 {
            vowels.push("y");
        }

        let mut word = String::new();
        let mut on_vowels = rng.gen_range(0..3) == 0;

        for _ in 0..len {
            if on_vowels {
                word.push_str(vowels[rng.gen_range(0..vowels.len())]);
            } else {
                // After a vowel group, mid-word consonant clusters are
                // allowed too.
                let pick = rng.gen_range(0..cons.len() + midcons.len());
                if word.is_empty() {
                    word.push_str(cons[rng.gen_range(0..cons.len())]);
                } else if pick < cons.len() {
                    word.push_str(cons[pick]);
                } else {
                    word.push_str(midcons[pick - cons.len()]);
                }
            }
            on_vowels = !on_vowels;
        }

        word.truncate(len);

        // Clusters that cannot end a word force a retry.
        if noend.iter().any(|noe| word.len() > noe.len() && word.ends_with(noe)) {
            continue;
        }
        return word;
    }
}

// ============================================================================
// Escaping and formatting
// ============================================================================

/// Primary input filter for text where angle chars are not permitted; they
/// are replaced with safer brackets.
pub fn escape_tags(input: &str) -> String {
    input.replace('<', "[").replace('>', "]")
}

/// Format a byte count with a data-measurement unit (B, KB, MB, GB, TB).
///
/// # Examples
///
/// ```
/// use fedibase::util::strings::format_bytes;
///
/// assert_eq!(format_bytes(0, 2), "0 B");
/// assert_eq!(format_bytes(1536, 2), "1.5 KB");
/// assert_eq!(format_bytes(1_073_741_824, 2), "1 GB");
/// ```
pub fn format_bytes(bytes: u64, precision: u32) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let pow = if bytes > 0 {
        (((bytes as f64).ln() / 1024f64.ln()).floor() as usize).min(UNITS.len() - 1)
    } else {
        0
    };

    let value = bytes as f64 / 1024f64.powi(pow as i32);
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;

    format!("{} {}", rounded, UNITS[pow])
}

/// Remove indentation from a text block, using the indentation of its first
/// non-empty line.
pub fn deindent(text: &str) -> String {
    deindent_with(text, "[\t ]", None)
}

/// Remove `count` leading occurrences of the `chr` pattern from every line;
/// a `None` count is measured from the first non-empty line.
pub fn deindent_with(text: &str, chr: &str, count: Option<usize>) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    let count = match count {
        Some(count) => count,
        None => {
            let probe = match Regex::new(&format!("^{}*", chr)) {
                Ok(re) => re,
                Err(_) => return text.to_string(),
            };
            lines
                .iter()
                .find(|line| !line.is_empty())
                .and_then(|line| probe.find(line))
                .map(|m| m.as_str().len())
                .unwrap_or(0)
        }
    };

    let strip = match Regex::new(&format!("^{}{{{}}}", chr, count)) {
        Ok(re) => re,
        Err(_) => return text.to_string(),
    };

    lines
        .iter()
        .map(|line| strip.replace(line, "").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Base64url codec
// ============================================================================

/// Base64-encode with the URL-safe alphabet (`+/` become `-_`), optionally
/// stripping padding.
pub fn base64url_encode(data: &[u8], strip_padding: bool) -> String {
    if strip_padding {
        URL_SAFE_NO_PAD.encode(data)
    } else {
        URL_SAFE.encode(data)
    }
}

/// Decode a base64url string. Input with stripped padding is accepted, for
/// peers that send unpadded magic envelopes.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>, String> {
    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|e| format!("base64url_decode: illegal input: {}", e))
}

// ============================================================================
// URL normalization
// ============================================================================

/// Normalize a profile URL for comparison: https becomes http, a leading
/// `www.` host prefix and any trailing slash are dropped.
pub fn normalise_link(url: &str) -> String {
    url.replace("https:", "http:")
        .replace("//www.", "//")
        .trim_end_matches('/')
        .to_string()
}

/// Compare two URLs, ignoring insignificant differences such as the scheme,
/// a `www.` prefix, and case.
pub fn compare_link(a: &str, b: &str) -> bool {
    normalise_link(a).eq_ignore_ascii_case(&normalise_link(b))
}

/// Normalize an OpenID identity: strip the scheme and surrounding slashes.
pub fn normalise_openid(identity: &str) -> String {
    identity
        .replace("http://", "")
        .replace("https://", "")
        .trim_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_hex_length_and_alphabet() {
        for size in [1, 7, 16, 64] {
            let token = random_hex(size);
            assert_eq!(token.len(), size);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_random_hex_is_not_constant() {
        assert_ne!(random_hex(64), random_hex(64));
    }

    #[test]
    fn test_random_digits() {
        let digits = random_digits(10);
        assert_eq!(digits.len(), 10);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_random_name_shape() {
        assert_eq!(random_name(0), "");
        for _ in 0..50 {
            let name = random_name(8);
            assert_eq!(name.len(), 8);
            assert!(name.chars().all(|c| c.is_ascii_lowercase()));
            assert!(!name.ends_with("tr") && !name.ends_with('q'));
        }
    }

    #[test]
    fn test_escape_tags() {
        assert_eq!(escape_tags("<script>alert(1)</script>"), "[script]alert(1)[/script]");
        assert_eq!(escape_tags("plain"), "plain");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0, 2), "0 B");
        assert_eq!(format_bytes(512, 2), "512 B");
        assert_eq!(format_bytes(1024, 2), "1 KB");
        assert_eq!(format_bytes(1536, 2), "1.5 KB");
        assert_eq!(format_bytes(1_048_576, 2), "1 MB");
        assert_eq!(format_bytes(1_649_267_441_664, 1), "1.5 TB");
    }

    #[test]
    fn test_base64url_roundtrip() {
        let data = b"<subject>acct:alice@node.tld</subject>";
        let padded = base64url_encode(data, false);
        let stripped = base64url_encode(data, true);

        assert!(!padded.contains('+') && !padded.contains('/'));
        assert!(!stripped.contains('='));
        assert_eq!(base64url_decode(&padded).unwrap(), data);
        assert_eq!(base64url_decode(&stripped).unwrap(), data);
    }

    #[test]
    fn test_base64url_rejects_garbage() {
        assert!(base64url_decode("not base64!!").is_err());
    }

    #[test]
    fn test_normalise_link() {
        assert_eq!(
            normalise_link("https://www.example.com/profile/alice/"),
            "http://example.com/profile/alice"
        );
        assert_eq!(normalise_link("http://example.com"), "http://example.com");
    }

    #[test]
    fn test_compare_link() {
        assert!(compare_link(
            "https://www.Example.com/profile/alice",
            "http://example.com/profile/alice/"
        ));
        assert!(!compare_link(
            "http://example.com/profile/alice",
            "http://example.com/profile/bob"
        ));
    }

    #[test]
    fn test_normalise_openid() {
        assert_eq!(normalise_openid("https://openid.example.com/"), "openid.example.com");
        assert_eq!(normalise_openid("http://me.example.org"), "me.example.org");
    }

    #[test]
    fn test_deindent() {
        let text = "\n\tline one\n\t\tline two\n\tline three";
        assert_eq!(deindent(text), "\nline one\n\tline two\nline three");
    }

    #[test]
    fn test_deindent_explicit_count() {
        let text = "    a\n      b";
        assert_eq!(deindent_with(text, "[ ]", Some(4)), "a\n  b");
    }
}
