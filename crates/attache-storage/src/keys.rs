//! Destination location generation.
//!
//! Format: `{record_type}/{record_id}/{field}/{uid}{.ext}`.

use attache_core::{UploadContext, UploadedFile};
use rand::Rng;

/// Generate the destination path for `file` within its owning record.
pub fn generate_location(file: &UploadedFile, context: &UploadContext) -> String {
    let uid = generate_uid();
    let filename = match file.extension() {
        Some(ext) => format!("{}.{}", uid, ext),
        None => uid,
    };

    format!(
        "{}/{}/{}/{}",
        underscore(&context.record.record_type),
        context.record.record_id,
        context.name,
        filename
    )
}

fn generate_uid() -> String {
    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
    hex::encode(random_bytes)
}

/// `Admin::BlogPost` → `admin/blog_post`, `HTTPLog` → `http_log`
fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, segment) in name.split("::").enumerate() {
        if i > 0 {
            out.push('/');
        }
        let chars: Vec<char> = segment.chars().collect();
        for (j, &c) in chars.iter().enumerate() {
            if c.is_ascii_uppercase() && j > 0 {
                let prev = chars[j - 1];
                let next_lower = chars.get(j + 1).is_some_and(|n| n.is_ascii_lowercase());
                // Word boundary, or the last capital of an acronym run starting a word
                if prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_lower)
                {
                    out.push('_');
                }
            }
            out.push(if c == '-' { '_' } else { c.to_ascii_lowercase() });
        }
    }
    out
}
