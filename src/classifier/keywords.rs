//! Keyword trigger sets.
//!
//! One immutable [`KeywordSet`] per intent category plus the auxiliary sets
//! the policy layer needs (affirmation/negation answers, course interest,
//! financing channels). The table is built once at startup and shared
//! read-only across all requests; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a keyword set inside the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetId {
    Definition,
    Legal,
    Payment,
    Ambassador,
    Contact,
    Formation,
    HumanHandoff,
    FundingCode,
    ProspectPitch,
    Delay,
    Hostility,
    Affirmation,
    Negation,
    CourseInterest,
    SelfFunded,
    Opco,
}

impl std::fmt::Display for SetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definition => write!(f, "definition"),
            Self::Legal => write!(f, "legal"),
            Self::Payment => write!(f, "payment"),
            Self::Ambassador => write!(f, "ambassador"),
            Self::Contact => write!(f, "contact"),
            Self::Formation => write!(f, "formation"),
            Self::HumanHandoff => write!(f, "human_handoff"),
            Self::FundingCode => write!(f, "funding_code"),
            Self::ProspectPitch => write!(f, "prospect_pitch"),
            Self::Delay => write!(f, "delay"),
            Self::Hostility => write!(f, "hostility"),
            Self::Affirmation => write!(f, "affirmation"),
            Self::Negation => write!(f, "negation"),
            Self::CourseInterest => write!(f, "course_interest"),
            Self::SelfFunded => write!(f, "self_funded"),
            Self::Opco => write!(f, "opco"),
        }
    }
}

/// A named, immutable set of lower-case trigger phrases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSet {
    id: SetId,
    phrases: Vec<String>,
}

impl KeywordSet {
    pub fn new(id: SetId, phrases: &[&str]) -> Self {
        Self {
            id,
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn id(&self) -> SetId {
        self.id
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// True when any phrase triggers against the normalized text.
    pub fn matches(&self, text: &str) -> bool {
        self.phrases.iter().any(|p| phrase_matches(text, p))
    }
}

/// Substring test for multi-word and long phrases. Single words shorter
/// than five characters are matched token-wise: "non" must not trigger
/// inside "anonyme", "oui" inside "inouï".
fn phrase_matches(text: &str, phrase: &str) -> bool {
    if phrase.contains(' ') || phrase.chars().count() >= 5 {
        text.contains(phrase)
    } else {
        text.split(|c: char| !c.is_alphanumeric())
            .any(|token| token == phrase)
    }
}

/// The full trigger table, one entry per [`SetId`].
#[derive(Debug, Clone)]
pub struct KeywordTable {
    sets: HashMap<SetId, KeywordSet>,
}

impl KeywordTable {
    /// Build a table from explicit sets. Missing ids behave as empty sets.
    pub fn new(sets: Vec<KeywordSet>) -> Self {
        Self {
            sets: sets.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// The tenant's production trigger table.
    pub fn builtin() -> Self {
        Self::new(vec![
            KeywordSet::new(
                SetId::Definition,
                &[
                    "c'est quoi",
                    "qu'est ce que",
                    "qu'est-ce que",
                    "ca veut dire quoi",
                    "ça veut dire quoi",
                    "que veut dire",
                    "définition",
                    "definition",
                    "what is a",
                    "what is an",
                    "what does",
                ],
            ),
            KeywordSet::new(
                SetId::Legal,
                &[
                    "avocat",
                    "plainte",
                    "arnaque",
                    "escroquerie",
                    "fraude",
                    "frauduleux",
                    "signalement",
                    "mise en demeure",
                    "tribunal",
                    "justice",
                    "répression des fraudes",
                    "lawyer",
                    "scam",
                    "fraud",
                    "legal action",
                    "sue you",
                ],
            ),
            KeywordSet::new(
                SetId::Payment,
                &[
                    "paiement",
                    "payement",
                    "virement",
                    "payé",
                    "payée",
                    "rémunération",
                    "rémunéré",
                    "rémunérée",
                    "toujours pas reçu",
                    "pas reçu l'argent",
                    "payment",
                    "paid",
                ],
            ),
            KeywordSet::new(
                SetId::Ambassador,
                &[
                    "ambassadeur",
                    "ambassadrice",
                    "parrainage",
                    "parrainer",
                    "affiliation",
                    "affilié",
                    "affiliée",
                    "ambassador",
                    "referral",
                ],
            ),
            KeywordSet::new(
                SetId::Contact,
                &[
                    "transmettre mes coordonnées",
                    "mes coordonnées",
                    "mon numéro",
                    "me rappeler",
                    "rappelez-moi",
                    "rappelez moi",
                    "qu'on me rappelle",
                    "me joindre",
                    "call me back",
                    "my phone number",
                ],
            ),
            KeywordSet::new(
                SetId::Formation,
                &[
                    "formation",
                    "formations",
                    "catalogue",
                    "se former",
                    "me former",
                    "apprendre",
                    "programme de formation",
                    "training",
                    "course",
                    "enroll",
                ],
            ),
            KeywordSet::new(
                SetId::HumanHandoff,
                &[
                    "parler à un humain",
                    "parler à quelqu'un",
                    "un conseiller",
                    "une conseillère",
                    "une vraie personne",
                    "un vrai humain",
                    "agent humain",
                    "speak to a human",
                    "real person",
                ],
            ),
            KeywordSet::new(
                SetId::FundingCode,
                &[
                    "code cpf",
                    "code de la formation",
                    "code formation",
                    "numéro de formation",
                    "numéro cpf",
                    "cpf code",
                ],
            ),
            KeywordSet::new(
                SetId::ProspectPitch,
                &[
                    "argumentaire",
                    "convaincre",
                    "présenter l'offre",
                    "une plaquette",
                    "un ami intéressé",
                    "une amie intéressée",
                    "prospect",
                    "pitch",
                ],
            ),
            KeywordSet::new(
                SetId::Delay,
                &[
                    "délai",
                    "délais",
                    "combien de temps",
                    "ça prend combien",
                    "sous combien de temps",
                    "sous quel délai",
                    "how long",
                    "delay",
                ],
            ),
            KeywordSet::new(
                SetId::Hostility,
                &[
                    "nuls",
                    "incompétent",
                    "incompétents",
                    "voleurs",
                    "honte",
                    "foutage de gueule",
                    "merde",
                    "useless",
                    "pathetic",
                ],
            ),
            KeywordSet::new(
                SetId::Affirmation,
                &[
                    "oui",
                    "yes",
                    "yep",
                    "ok",
                    "d'accord",
                    "daccord",
                    "parfait",
                    "bien sûr",
                    "volontiers",
                    "je veux bien",
                    "allez-y",
                    "allez y",
                    "carrément",
                    "avec plaisir",
                    "c'est bon pour moi",
                ],
            ),
            KeywordSet::new(
                SetId::Negation,
                &[
                    "non",
                    "no",
                    "nope",
                    "pas encore",
                    "pas du tout",
                    "jamais",
                    "pas vraiment",
                    "je ne pense pas",
                    "on m'a rien dit",
                    "on ne m'a rien dit",
                ],
            ),
            KeywordSet::new(
                SetId::CourseInterest,
                &[
                    "intéresse",
                    "intéressé",
                    "intéressée",
                    "je choisis",
                    "je veux faire",
                    "celle-là",
                    "celle là",
                    "community manager",
                    "marketing digital",
                    "création de site",
                    "e-commerce",
                    "graphisme",
                    "montage vidéo",
                    "interested in",
                ],
            ),
            KeywordSet::new(
                SetId::SelfFunded,
                &[
                    "financé moi-même",
                    "financée moi-même",
                    "financé moi même",
                    "payé moi-même",
                    "payé moi même",
                    "payé de ma poche",
                    "de ma poche",
                    "autofinancé",
                    "autofinancée",
                    "fonds propres",
                    "sur mes fonds",
                    "par carte",
                    "en plusieurs fois",
                    "financé en direct",
                    "paid myself",
                    "self funded",
                    "self-funded",
                ],
            ),
            KeywordSet::new(
                SetId::Opco,
                &[
                    "opco",
                    "mon employeur",
                    "par l'employeur",
                    "mon entreprise a financé",
                    "l'entreprise a payé",
                    "plan de développement des compétences",
                    "employer fund",
                ],
            ),
        ])
    }

    pub fn get(&self, id: SetId) -> Option<&KeywordSet> {
        self.sets.get(&id)
    }

    /// Total match test: an id missing from the table never triggers.
    pub fn matches(&self, id: SetId, text: &str) -> bool {
        self.sets.get(&id).is_some_and(|s| s.matches(text))
    }
}
