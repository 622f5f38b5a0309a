use crate::{Error, Result, Tag};

/// Longest value a two digit length marker can describe.
pub const MAX_VALUE_LEN: usize = 99;

/// One `TAG + LEN + VALUE` field borrowed from a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field<'a> {
    pub tag: &'a str,
    pub value: &'a str,
    /// Byte offset of the tag within the walked string.
    pub offset: usize,
}

/// Appends `tag`, the zero padded byte length of `value`, and `value`.
pub fn write_field(out: &mut String, tag: Tag, value: &str) -> Result<()> {
    if value.len() > MAX_VALUE_LEN {
        return Err(Error::invalid(format!(
            "field {} is {} bytes, at most {} fit",
            tag,
            value.len(),
            MAX_VALUE_LEN
        )));
    }
    out.push_str(tag);
    out.push_str(&format!("{:02}", value.len()));
    out.push_str(value);
    Ok(())
}

/// Builds a template: a field whose value is itself a run of fields.
pub fn nested(tag: Tag, inner: &[(Tag, &str)]) -> Result<String> {
    let mut value = String::new();
    for &(inner_tag, inner_value) in inner {
        write_field(&mut value, inner_tag, inner_value)?;
    }
    let mut out = String::with_capacity(value.len() + 4);
    write_field(&mut out, tag, &value)?;
    Ok(out)
}

/// Cuts `value` to at most `max` bytes without splitting a character.
pub fn truncate(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Walks the fields of a TLV string in order.
pub fn fields(s: &str) -> Fields<'_> {
    Fields { s, pos: 0, base: 0 }
}

/// Like [`fields`], but reported offsets are shifted by `base`. Used for
/// templates so errors point into the whole payload.
pub(crate) fn fields_at(s: &str, base: usize) -> Fields<'_> {
    Fields { s, pos: 0, base }
}

#[derive(Clone, Debug)]
pub struct Fields<'a> {
    s: &'a str,
    pos: usize,
    base: usize,
}

impl<'a> Fields<'a> {
    fn fail(&mut self, reason: &'static str) -> Option<Result<Field<'a>>> {
        let offset = self.base + self.pos;
        // Nothing after a bad field can be trusted.
        self.pos = self.s.len();
        Some(Err(Error::Malformed { offset, reason }))
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<Field<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.s[self.pos..];
        if rest.is_empty() {
            return None;
        }
        if rest.len() < 4 {
            return self.fail("truncated field header");
        }
        let header = match rest.get(..4) {
            Some(header) if header.bytes().all(|b| b.is_ascii_digit()) => header,
            _ => return self.fail("field header is not four digits"),
        };
        let (tag, len) = header.split_at(2);
        // Four ascii digits always parse.
        let len: usize = len.parse().unwrap_or_default();
        if rest.len() < 4 + len {
            return self.fail("value shorter than its length marker");
        }
        let value = match rest.get(4..4 + len) {
            Some(value) => value,
            None => return self.fail("value splits a character"),
        };
        let field = Field {
            tag,
            value,
            offset: self.base + self.pos,
        };
        self.pos += 4 + len;
        Some(Ok(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn length_is_zero_padded() {
        let mut out = String::new();
        write_field(&mut out, "58", "BR").unwrap();
        write_field(&mut out, "53", "986").unwrap();
        assert_eq!(out, "5802BR5303986");
    }

    #[test]
    pub fn length_counts_bytes() {
        let mut out = String::new();
        write_field(&mut out, "60", "SÃO PAULO").unwrap();
        assert_eq!(out, "6010SÃO PAULO");
    }

    #[test]
    pub fn overlong_value_rejected() {
        let mut out = String::new();
        let value = "x".repeat(MAX_VALUE_LEN + 1);
        assert!(matches!(
            write_field(&mut out, "05", &value),
            Err(Error::InvalidArgument(_))
        ));
        assert!(out.is_empty());

        let value = "x".repeat(MAX_VALUE_LEN);
        write_field(&mut out, "05", &value).unwrap();
        assert!(out.starts_with("0599"));
    }

    #[test]
    pub fn nested_wraps_inner_fields() {
        let out = nested("62", &[("05", "ABC123")]).unwrap();
        assert_eq!(out, "62100506ABC123");
    }

    #[test]
    pub fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("SAO PAULO", 15), "SAO PAULO");
        assert_eq!(truncate("ABCDEFGHIJ", 4), "ABCD");
        // 'Ã' is two bytes and would straddle the cut.
        assert_eq!(truncate("SÃO", 2), "S");
        assert_eq!(truncate("SÃO", 3), "SÃ");
    }

    #[test]
    pub fn walks_fields_in_order() {
        let got: Vec<(&str, &str)> = fields("0002015802BR")
            .map(|f| f.map(|f| (f.tag, f.value)))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(got, vec![("00", "01"), ("58", "BR")]);

        let offsets: Vec<_> = fields("0002015802BR")
            .map(|f| f.unwrap().offset)
            .collect();
        assert_eq!(offsets, vec![0, 6]);
    }

    #[test]
    pub fn malformed_input_errors_once() {
        let mut walk = fields("000201590");
        assert!(walk.next().unwrap().is_ok());
        assert_eq!(
            walk.next(),
            Some(Err(Error::Malformed {
                offset: 6,
                reason: "truncated field header"
            }))
        );
        assert_eq!(walk.next(), None);

        let mut walk = fields_at("5905ABC", 10);
        assert_eq!(
            walk.next(),
            Some(Err(Error::Malformed {
                offset: 10,
                reason: "value shorter than its length marker"
            }))
        );
        assert_eq!(walk.next(), None);

        // 'Ã' is two bytes; a one byte length ends inside it.
        let mut walk = fields("5901Ã");
        assert_eq!(
            walk.next(),
            Some(Err(Error::Malformed {
                offset: 0,
                reason: "value splits a character"
            }))
        );
        assert_eq!(walk.next(), None);
        assert_eq!(fields("5902Ã").next().unwrap().unwrap().value, "Ã");

        let mut walk = fields("5X02BR");
        assert!(matches!(walk.next(), Some(Err(Error::Malformed { offset: 0, .. }))));
    }
}
