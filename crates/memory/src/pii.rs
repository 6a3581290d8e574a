//! PII masking applied to memory event content before storage.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

// International or local numbers with at least 7 digits, allowing spaces,
// dots, dashes and parenthesized area codes.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\(?\d[\d\s().-]{5,}\d").expect("valid phone pattern")
});

pub const EMAIL_PLACEHOLDER: &str = "[email]";
pub const PHONE_PLACEHOLDER: &str = "[phone]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PiiMasker {
    pub mask_emails: bool,
    pub mask_phones: bool,
}

impl PiiMasker {
    pub fn new(mask_emails: bool, mask_phones: bool) -> Self {
        Self {
            mask_emails,
            mask_phones,
        }
    }

    pub fn mask(&self, text: &str) -> String {
        let mut out = text.to_string();
        if self.mask_emails {
            out = EMAIL.replace_all(&out, EMAIL_PLACEHOLDER).into_owned();
        }
        if self.mask_phones {
            out = PHONE
                .replace_all(&out, |caps: &regex::Captures<'_>| {
                    let digits = caps[0].chars().filter(char::is_ascii_digit).count();
                    if digits >= 7 {
                        PHONE_PLACEHOLDER.to_string()
                    } else {
                        caps[0].to_string()
                    }
                })
                .into_owned();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_emails() {
        let masker = PiiMasker::new(true, false);
        assert_eq!(masker.mask("contact me at a@b.com"), "contact me at [email]");
        assert_eq!(
            masker.mask("juan.perez+test@correo.example.es y ana@x.io"),
            "[email] y [email]"
        );
    }

    #[test]
    fn disabled_masker_is_identity() {
        let masker = PiiMasker::default();
        assert_eq!(masker.mask("a@b.com 555-123-4567"), "a@b.com 555-123-4567");
    }

    #[test]
    fn masks_phones() {
        let masker = PiiMasker::new(false, true);
        assert_eq!(masker.mask("llámame al +34 612 345 678"), "llámame al [phone]");
        assert_eq!(masker.mask("call (555) 123-4567 now"), "call [phone] now");
    }

    #[test]
    fn short_numbers_are_kept() {
        let masker = PiiMasker::new(false, true);
        assert_eq!(masker.mask("El pedido 123 fue entregado"), "El pedido 123 fue entregado");
        assert_eq!(masker.mask("año 2024"), "año 2024");
    }
}
