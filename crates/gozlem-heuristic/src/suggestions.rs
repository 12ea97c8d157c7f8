use gozlem_core::models::assessment::DomainScores;
use gozlem_core::models::domain::{Domain, Locale};

pub const MAX_SUGGESTIONS: usize = 3;

/// Fixed suggestion pool for a domain.
pub fn pool(domain: Domain, locale: Locale) -> &'static [&'static str; 3] {
    match locale {
        Locale::Tr => pool_tr(domain),
        Locale::En => pool_en(domain),
    }
}

fn pool_tr(domain: Domain) -> &'static [&'static str; 3] {
    match domain {
        Domain::Turkish => &[
            "Günlük rutinde açık uçlu sorular sorun ve yanıtları genişletin.",
            "Günlük bir kitap okuma saati belirleyin ve resimlerden çıkarım yaptırın.",
            "Yeni kelimeleri gün içinde cümle içinde kullanmasını teşvik edin.",
        ],
        Domain::Math => &[
            "Eşleştirme ve sınıflama oyunlarına kısa günlük oturumlar ekleyin.",
            "Sayı sayma ve sıralama etkinlikleri yapın.",
            "Geometrik şekilleri günlük hayatta göstermeye çalışın.",
        ],
        Domain::Science => &[
            "Doğa yürüyüşlerinde gözlem soruları sorun.",
            "Basit deneyler yaparak merakını destekleyin.",
            "Bitki yetiştirme projesi başlatın.",
        ],
        Domain::Social => &[
            "Sıra bekleme ve paylaşım içeren işbirlikli oyunlar planlayın.",
            "Duygularını ifade edebileceği \"duygu kartları\" kullanın.",
            "Rol oyunu ile çatışmaları konuşarak çözme pratikleri yapın.",
        ],
        Domain::MotorHealth => &[
            "Denge tahtası, sek sek ve hedefe atma oyunlarına zaman ayırın.",
            "El yıkama adımlarını posterle hatırlatın ve pekiştirin.",
            "Makasla çizgi boyunca kesme ve ince motor çalışmaları yapın.",
        ],
        Domain::Art => &[
            "Farklı sanat malzemeleriyle deneyler yapmasına fırsat verin.",
            "Özgür resim çalışmaları için zaman ayırın.",
            "Üç boyutlu çalışmalar (hamur, kil) ile yaratıcılığı destekleyin.",
        ],
        Domain::Music => &[
            "Günlük ritim ve şarkı aktiviteleri ekleyin.",
            "Basit ritim aletleri kullanarak müzik yapmasını teşvik edin.",
            "Dans ve hareket etkinlikleriyle müziği birleştirin.",
        ],
    }
}

fn pool_en(domain: Domain) -> &'static [&'static str; 3] {
    match domain {
        Domain::Turkish => &[
            "Ask open-ended questions during daily routines and expand on the answers.",
            "Set a daily reading time and ask for inferences from the pictures.",
            "Encourage using new words in sentences throughout the day.",
        ],
        Domain::Math => &[
            "Add short daily sessions of matching and sorting games.",
            "Do counting and ordering activities.",
            "Point out geometric shapes in everyday life.",
        ],
        Domain::Science => &[
            "Ask observation questions during nature walks.",
            "Support curiosity with simple experiments.",
            "Start a plant-growing project.",
        ],
        Domain::Social => &[
            "Plan cooperative games that involve turn-taking and sharing.",
            "Use \"emotion cards\" to help express feelings.",
            "Practise resolving conflicts by talking through role play.",
        ],
        Domain::MotorHealth => &[
            "Make time for balance board, hopscotch and target-throwing games.",
            "Remind and reinforce hand-washing steps with a poster.",
            "Practise cutting along lines with scissors and other fine motor work.",
        ],
        Domain::Art => &[
            "Give opportunities to experiment with different art materials.",
            "Set aside time for free drawing.",
            "Support creativity with three-dimensional work (dough, clay).",
        ],
        Domain::Music => &[
            "Add daily rhythm and song activities.",
            "Encourage making music with simple rhythm instruments.",
            "Combine music with dance and movement activities.",
        ],
    }
}

/// Up to [`MAX_SUGGESTIONS`] suggestions, round-robin over `domains`
/// ordered by ascending score (stable, so ties keep tag order).
pub fn pick(scores: &DomainScores, domains: &[Domain], locale: Locale) -> Vec<String> {
    let mut ordered: Vec<Domain> = domains.to_vec();
    ordered.sort_by_key(|d| scores.get(d).copied().unwrap_or(u8::MAX));

    let mut out: Vec<String> = Vec::with_capacity(MAX_SUGGESTIONS);
    for round in 0..3 {
        for domain in &ordered {
            if out.len() == MAX_SUGGESTIONS {
                return out;
            }
            let candidate = pool(*domain, locale)[round];
            if !out.iter().any(|s| s == candidate) {
                out.push(candidate.to_string());
            }
        }
    }
    out
}
