//! Buyer-country availability checks on offer detail pages.

/// Phrases that introduce a shipping restriction, lower case.
const RESTRICTION_PHRASES: &[&str] = &[
    "unavailable in",
    "not available in",
    "does not ship to",
    "doesn't ship to",
    "will not ship to",
    "won't ship to",
    "no shipping to",
    "cannot be shipped to",
    "does not deliver to",
    "nicht verfügbar in",
    "nicht lieferbar nach",
    "kein versand nach",
    "versendet nicht nach",
    "non disponible en",
    "no disponible en",
    "non disponibile in",
];

/// Words that may sit between a phrase and the countries it lists.
const FILLER_WORDS: &[&str] = &[
    "the", "following", "countries", "country", "and", "or", "und", "oder", "folgende",
    "folgenden", "länder", "ländern", "les", "pays", "et", "ou", "y", "o", "e",
];

/// Punctuation allowed between listed countries.
const LIST_SEPARATORS: &[char] = &[':', ',', ';', '/', '&'];

/// Known countries by code with their English and native names, lower case.
const COUNTRIES: &[(&str, &[&str])] = &[
    ("DE", &["germany", "deutschland", "allemagne", "alemania"]),
    ("AT", &["austria", "österreich"]),
    ("CH", &["switzerland", "schweiz", "suisse"]),
    ("FR", &["france", "frankreich", "francia"]),
    ("IT", &["italy", "italia", "italien"]),
    ("ES", &["spain", "españa", "spanien"]),
    ("PT", &["portugal"]),
    ("NL", &["netherlands", "nederland", "niederlande", "holland"]),
    ("BE", &["belgium", "belgië", "belgique", "belgien"]),
    ("LU", &["luxembourg", "luxemburg"]),
    ("IE", &["ireland"]),
    ("GB", &["united kingdom", "uk", "great britain", "großbritannien"]),
    ("US", &["united states", "usa", "u.s.", "vereinigte staaten"]),
    ("CA", &["canada", "kanada"]),
    ("MX", &["mexico", "méxico"]),
    ("BR", &["brazil", "brasil"]),
    ("AU", &["australia", "australien"]),
    ("NZ", &["new zealand"]),
    ("JP", &["japan"]),
    ("SE", &["sweden", "sverige", "schweden"]),
    ("NO", &["norway", "norge", "norwegen"]),
    ("DK", &["denmark", "danmark", "dänemark"]),
    ("FI", &["finland", "suomi", "finnland"]),
    ("PL", &["poland", "polska", "polen"]),
    ("CZ", &["czech republic", "czechia", "tschechien"]),
    ("GR", &["greece", "griechenland"]),
    ("HU", &["hungary", "ungarn"]),
    ("RU", &["russia", "russland"]),
    ("UA", &["ukraine"]),
    ("TR", &["turkey", "türkei"]),
    ("IL", &["israel"]),
    ("ZA", &["south africa"]),
    ("KR", &["south korea", "korea"]),
    ("CN", &["china"]),
    ("IN", &["india"]),
    ("AR", &["argentina"]),
    ("CL", &["chile"]),
];

fn canonical_code(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "UK" => "GB".to_string(),
        other => other.to_string(),
    }
}

/// English and native names for a country code.
#[must_use]
pub fn country_names(code: &str) -> &'static [&'static str] {
    let code = canonical_code(code);
    COUNTRIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, names)| *names)
        .unwrap_or_default()
}

/// True when `text` starts with `word` followed by a non-alphanumeric.
fn starts_with_word(text: &str, word: &str) -> bool {
    text.starts_with(word)
        && !text[word.len()..]
            .chars()
            .next()
            .is_some_and(char::is_alphanumeric)
}

/// The longest country name at the start of `text`, with its code.
fn country_at(text: &str) -> Option<(&'static str, usize)> {
    COUNTRIES
        .iter()
        .flat_map(|(code, names)| names.iter().map(move |name| (*code, name.len(), *name)))
        .filter(|(_, _, name)| starts_with_word(text, name))
        .max_by_key(|(_, len, _)| *len)
        .map(|(code, len, _)| (code, len))
}

/// Codes of the countries listed right at the start of `tail`.
///
/// The list is read item by item across separators and filler words and
/// ends at the first word that is neither, so a sentence end closes it.
fn listed_countries(tail: &str) -> Vec<&'static str> {
    let mut codes = Vec::new();
    let mut rest = tail;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || LIST_SEPARATORS.contains(&c));
        if let Some((code, len)) = country_at(rest) {
            codes.push(code);
            rest = &rest[len..];
        } else if let Some(word) = FILLER_WORDS.iter().find(|w| starts_with_word(rest, w)) {
            rest = &rest[word.len()..];
        } else {
            return codes;
        }
    }
}

/// True when `page_text` says the offer cannot go to `country`.
///
/// A restriction phrase only counts for the countries it lists directly,
/// so "Unavailable in Austria. Ships from Germany" restricts Austria alone.
#[must_use]
pub fn is_unavailable(page_text: &str, country: &str) -> bool {
    let code = canonical_code(country);
    if country_names(&code).is_empty() {
        return false;
    }
    let lower = page_text.to_lowercase();

    RESTRICTION_PHRASES.iter().any(|phrase| {
        lower.match_indices(phrase).any(|(start, _)| {
            listed_countries(&lower[start + phrase.len()..])
                .iter()
                .any(|listed| *listed == code)
        })
    })
}
