use md5::{Digest, Md5};

/// Name of the signature field. It never takes part in its own computation.
pub const SIGN_FIELD: &str = "sign";

/// Sorted `key=value` pairs joined by `&`
pub fn canonical_string<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params
        .into_iter()
        .filter(|(key, _)| *key != SIGN_FIELD)
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex MD5 of the canonical string with the salt appended
pub fn sign<'a, I>(params: I, salt: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = Md5::new();
    hasher.update(canonical_string(params).as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}
