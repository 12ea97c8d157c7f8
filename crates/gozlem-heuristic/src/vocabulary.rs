use gozlem_core::models::domain::Domain;

/// Folded activity words that tie a note to a development domain.
pub fn activity_words(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Turkish => &[
            "hikaye", "kelime", "konus", "soru", "cumle", "sohbet", "anlat", "kitap", "okuma",
        ],
        Domain::Math => &[
            "sayi", "sayma", "esles", "sekil", "oruntu", "olcu", "sirala", "sinifla", "puzzle",
        ],
        Domain::Science => &[
            "deney", "doga", "bitki", "gozlem", "hava", "merak", "hayvan", "buyutec",
        ],
        Domain::Social => &[
            "arkadas", "paylas", "sira", "oyun", "isbirligi", "duygu", "kural", "grup",
        ],
        Domain::MotorHealth => &[
            "topu", "top ", "denge", "makas", "boncuk", "el yika", "giyin", "kosu", "zipla",
            "tirman", "fermuar",
        ],
        Domain::Art => &["resim", "boya", "hamur", "kolaj", "cizim", "renk", "kil"],
        Domain::Music => &["sarki", "ritim", "melodi", "dans", "muzik", "calgi", "enstruman"],
    }
}

pub fn mentions(folded: &str, domain: Domain) -> bool {
    activity_words(domain).iter().any(|w| folded.contains(w))
}
