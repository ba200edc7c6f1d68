//! Tabela estática de códigos de discagem e formatação de valores de contato.
//!
//! Valores de WhatsApp, telefone e Telegram são gravados com o código do
//! país já concatenado (`+5511999999999`). Para edição, o código é
//! recuperado pelo maior prefixo da tabela que casa com o valor gravado.

use serde::Serialize;

use crate::models::customer::ContactType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialingCode {
    pub iso: &'static str,
    pub name: &'static str,
    pub dial_code: &'static str,
}

const fn dc(iso: &'static str, name: &'static str, dial_code: &'static str) -> DialingCode {
    DialingCode { iso, name, dial_code }
}

pub static DIALING_CODES: &[DialingCode] = &[
    dc("BR", "Brasil", "+55"),
    dc("PT", "Portugal", "+351"),
    dc("US", "United States", "+1"),
    dc("CA", "Canada", "+1"),
    dc("DO", "República Dominicana", "+1809"),
    dc("JM", "Jamaica", "+1876"),
    dc("PR", "Puerto Rico", "+1787"),
    dc("AR", "Argentina", "+54"),
    dc("BO", "Bolivia", "+591"),
    dc("CL", "Chile", "+56"),
    dc("CO", "Colombia", "+57"),
    dc("CR", "Costa Rica", "+506"),
    dc("EC", "Ecuador", "+593"),
    dc("SV", "El Salvador", "+503"),
    dc("GT", "Guatemala", "+502"),
    dc("HN", "Honduras", "+504"),
    dc("MX", "México", "+52"),
    dc("NI", "Nicaragua", "+505"),
    dc("PA", "Panamá", "+507"),
    dc("PY", "Paraguay", "+595"),
    dc("PE", "Perú", "+51"),
    dc("UY", "Uruguay", "+598"),
    dc("VE", "Venezuela", "+58"),
    dc("AO", "Angola", "+244"),
    dc("MZ", "Moçambique", "+258"),
    dc("CV", "Cabo Verde", "+238"),
    dc("ZA", "South Africa", "+27"),
    dc("ES", "España", "+34"),
    dc("FR", "France", "+33"),
    dc("DE", "Deutschland", "+49"),
    dc("IT", "Italia", "+39"),
    dc("GB", "United Kingdom", "+44"),
    dc("IE", "Ireland", "+353"),
    dc("NL", "Nederland", "+31"),
    dc("BE", "België", "+32"),
    dc("CH", "Schweiz", "+41"),
    dc("AT", "Österreich", "+43"),
    dc("PL", "Polska", "+48"),
    dc("RU", "Россия", "+7"),
    dc("IL", "Israel", "+972"),
    dc("AE", "United Arab Emirates", "+971"),
    dc("IN", "India", "+91"),
    dc("CN", "China", "+86"),
    dc("JP", "Japan", "+81"),
    dc("KR", "South Korea", "+82"),
    dc("AU", "Australia", "+61"),
    dc("NZ", "New Zealand", "+64"),
];

/// Partes de um valor de contato para exibição em formulário.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactParts {
    pub country: Option<DialingCode>,
    pub local: String,
}

/// Maior código da tabela que prefixa `stored`. Empates ficam com o primeiro da tabela.
pub fn longest_prefix_match(stored: &str) -> Option<&'static DialingCode> {
    DIALING_CODES
        .iter()
        .filter(|code| stored.starts_with(code.dial_code))
        .fold(None, |best: Option<&'static DialingCode>, code| match best {
            Some(b) if b.dial_code.len() >= code.dial_code.len() => Some(b),
            _ => Some(code),
        })
}

pub fn find_by_iso(iso: &str) -> Option<&'static DialingCode> {
    DIALING_CODES.iter().find(|code| code.iso.eq_ignore_ascii_case(iso))
}

pub fn find_by_dial_code(dial_code: &str) -> Option<&'static DialingCode> {
    DIALING_CODES.iter().find(|code| code.dial_code == dial_code)
}

/// Só dígitos, espaços e a pontuação usual de telefone, com ao menos um dígito.
fn is_phone_like(raw: &str) -> bool {
    raw.chars().any(|c| c.is_ascii_digit())
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | '.' | ' '))
}

/// Mantém o `+` inicial e descarta tudo que não for dígito.
fn normalize_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if raw.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

/// `+` seguido apenas de dígitos.
fn is_canonical_number(stored: &str) -> bool {
    stored
        .strip_prefix('+')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Monta o valor gravado a partir do que foi digitado no formulário.
///
/// Para tipos com código de país, um número digitado com `+` já é
/// internacional e o código informado é ignorado. Valores que não parecem
/// número (ex.: `@usuario` no Telegram) são gravados como vieram.
pub fn format_contact_value(contact_type: ContactType, dial_code: Option<&str>, raw: &str) -> String {
    let raw = raw.trim();
    if !contact_type.requires_country_code() || !is_phone_like(raw) {
        return raw.to_string();
    }

    match dial_code {
        Some(code) if !raw.starts_with('+') => {
            let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
            format!("{code}{digits}")
        }
        _ => normalize_number(raw),
    }
}

/// Desfaz `format_contact_value` para edição.
pub fn decompose_contact_value(contact_type: ContactType, stored: &str) -> ContactParts {
    let whole = || ContactParts {
        country: None,
        local: stored.to_string(),
    };
    if !contact_type.requires_country_code() || !is_canonical_number(stored) {
        return whole();
    }

    match longest_prefix_match(stored) {
        Some(code) if stored.len() > code.dial_code.len() => ContactParts {
            country: Some(*code),
            local: stored[code.dial_code.len()..].to_string(),
        },
        _ => whole(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(contact_type: ContactType, stored: &str) -> String {
        let parts = decompose_contact_value(contact_type, stored);
        format_contact_value(contact_type, parts.country.map(|c| c.dial_code), &parts.local)
    }

    #[test]
    fn decomposes_brazilian_whatsapp() {
        let parts = decompose_contact_value(ContactType::Whatsapp, "+5511999999999");
        assert_eq!(parts.country.map(|c| c.iso), Some("BR"));
        assert_eq!(parts.local, "11999999999");
    }

    #[test]
    fn prefers_the_longest_dial_code() {
        let parts = decompose_contact_value(ContactType::Phone, "+18765551234");
        assert_eq!(parts.country.map(|c| c.iso), Some("JM"));
        assert_eq!(parts.local, "5551234");

        let parts = decompose_contact_value(ContactType::Phone, "+14155550100");
        assert_eq!(parts.country.map(|c| c.iso), Some("US"));

        let parts = decompose_contact_value(ContactType::Telegram, "+351912345678");
        assert_eq!(parts.country.map(|c| c.iso), Some("PT"));
    }

    #[test]
    fn stored_values_survive_round_trip() {
        let samples = [
            (ContactType::Whatsapp, "+5511999999999"),
            (ContactType::Phone, "+18095550000"),
            (ContactType::Telegram, "+447700900123"),
            (ContactType::Whatsapp, "+79161234567"),
            (ContactType::Phone, "+999123"),
            (ContactType::Telegram, "@roberto"),
        ];
        for (contact_type, stored) in samples {
            assert_eq!(round_trip(contact_type, stored), stored, "{contact_type:?} {stored}");
        }
    }

    #[test]
    fn non_phone_types_are_only_trimmed() {
        assert_eq!(
            format_contact_value(ContactType::Email, Some("+55"), "  ana@example.com "),
            "ana@example.com"
        );
        let parts = decompose_contact_value(ContactType::Instagram, "+55loja");
        assert_eq!(parts.country, None);
        assert_eq!(parts.local, "+55loja");
    }

    #[test]
    fn formatting_strips_punctuation_from_local_number() {
        assert_eq!(
            format_contact_value(ContactType::Whatsapp, Some("+55"), "(11) 99999-9999"),
            "+5511999999999"
        );
    }

    #[test]
    fn typed_values_are_stable_after_one_round_trip() {
        let typed = [
            (ContactType::Whatsapp, None, "+55 11 99999-9999"),
            (ContactType::Whatsapp, Some("+55"), "(11) 99999-9999"),
            (ContactType::Phone, None, " (11) 3333.4444 "),
            (ContactType::Phone, Some("+1"), "+1 876 555 1234"),
            (ContactType::Telegram, None, " @roberto "),
            (ContactType::Whatsapp, None, "+55"),
            (ContactType::Phone, None, "ramal 12"),
        ];
        for (contact_type, dial_code, raw) in typed {
            let stored = format_contact_value(contact_type, dial_code, raw);
            assert_eq!(round_trip(contact_type, &stored), stored, "{contact_type:?} {raw}");
        }
    }

    #[test]
    fn numbers_without_country_code_are_normalized() {
        assert_eq!(
            format_contact_value(ContactType::Whatsapp, None, "+55 11 99999-9999"),
            "+5511999999999"
        );
        assert_eq!(format_contact_value(ContactType::Phone, None, "(11) 3333-4444"), "1133334444");
        assert_eq!(
            format_contact_value(ContactType::Whatsapp, Some("+55"), "+351 912 345 678"),
            "+351912345678"
        );
    }

    #[test]
    fn non_numeric_values_are_not_decomposed() {
        let parts = decompose_contact_value(ContactType::Whatsapp, "+55abc");
        assert_eq!(parts.country, None);
        assert_eq!(parts.local, "+55abc");

        let parts = decompose_contact_value(ContactType::Phone, "+55");
        assert_eq!(parts.country, None);
    }

    #[test]
    fn dial_code_lookup_is_exact() {
        assert_eq!(find_by_dial_code("+1876").map(|c| c.iso), Some("JM"));
        assert!(find_by_dial_code("abc").is_none());
        assert!(find_by_dial_code("55").is_none());
    }

    #[test]
    fn iso_lookup_is_case_insensitive() {
        assert_eq!(find_by_iso("br").map(|c| c.dial_code), Some("+55"));
        assert!(find_by_iso("zz").is_none());
    }
}
