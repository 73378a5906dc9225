//! Key names accepted by `send-keys`, and the bytes a terminal would send
//! for them.

/// Bytes for a key name such as `Enter`, `C-c`, `M-x` or `F5`. A single
/// character names itself. Unknown names give `None`.
pub fn key_bytes(name: &str) -> Option<Vec<u8>> {
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Some(ch.to_string().into_bytes());
    }
    if let Some(rest) = strip_prefix_ci(name, "M-") {
        let mut bytes = vec![0x1b];
        bytes.extend(key_bytes(rest)?);
        return Some(bytes);
    }
    if let Some(rest) = strip_prefix_ci(name, "C-") {
        return control(rest);
    }
    let seq: &[u8] = match name {
        "Enter" => b"\r",
        "Tab" => b"\t",
        "BTab" => b"\x1b[Z",
        "Space" => b" ",
        "Escape" => b"\x1b",
        "BSpace" => b"\x7f",
        "Up" => b"\x1b[A",
        "Down" => b"\x1b[B",
        "Right" => b"\x1b[C",
        "Left" => b"\x1b[D",
        "Home" => b"\x1b[H",
        "End" => b"\x1b[F",
        "PageUp" | "PPage" => b"\x1b[5~",
        "PageDown" | "NPage" => b"\x1b[6~",
        "Insert" | "IC" => b"\x1b[2~",
        "Delete" | "DC" => b"\x1b[3~",
        "F1" => b"\x1bOP",
        "F2" => b"\x1bOQ",
        "F3" => b"\x1bOR",
        "F4" => b"\x1bOS",
        "F5" => b"\x1b[15~",
        "F6" => b"\x1b[17~",
        "F7" => b"\x1b[18~",
        "F8" => b"\x1b[19~",
        "F9" => b"\x1b[20~",
        "F10" => b"\x1b[21~",
        "F11" => b"\x1b[23~",
        "F12" => b"\x1b[24~",
        _ => return None,
    };
    Some(seq.to_vec())
}

fn control(rest: &str) -> Option<Vec<u8>> {
    let byte = match rest {
        "Space" | "@" => 0,
        "[" => 0x1b,
        "\\" => 0x1c,
        "]" => 0x1d,
        "^" => 0x1e,
        "_" => 0x1f,
        "?" => 0x7f,
        _ => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_lowercase() as u8 & 0x1f,
                _ => return None,
            }
        }
    };
    Some(vec![byte])
}

fn strip_prefix_ci<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    let rest = &name[prefix.len()..];
    (head.eq_ignore_ascii_case(prefix) && !rest.is_empty()).then_some(rest)
}

/// What `send-keys` writes for its arguments. Words that are not key names
/// are sent as typed.
pub fn encode_keys(words: &[String], literal: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for word in words {
        match (literal, key_bytes(word)) {
            (false, Some(bytes)) => out.extend(bytes),
            _ => out.extend_from_slice(word.as_bytes()),
        }
    }
    out
}
