//! Rule-based sentence segmentation and Named Entity Recognition
//!
//! An offline [`Tagger`] for running without a tagging service:
//! - Tokenization and sentence splitting with regex patterns
//! - Dictionary (gazetteer) matching for known names and places
//! - Heuristic patterns for dates, titled persons and organizations
//!
//! Recall is modest compared to a statistical tagger; it exists so the
//! pipeline can run end to end on a single machine.

use std::collections::HashMap;

use regex::Regex;
use snowball_core::{EntityLabel, EntitySpan, Result, SnowballError, TaggedSentence, Tagger, Token};

/// Words that end organization names
const ORG_SUFFIXES: &[&str] = &[
    "University", "College", "Institute", "School", "Academy", "Inc.", "Corp.", "Co.", "Ltd.",
    "Inc", "Corp", "Corporation", "Company", "Group", "Foundation", "Labs", "Laboratories",
    "Technologies", "Systems", "Bank", "Association", "Agency", "Department", "Ministry",
];

/// Words that start organization names
const ORG_PREFIXES: &[&str] = &["University", "Bank", "Department", "Ministry"];

/// Honorifics that precede person names
const PERSON_TITLES: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sir", "CEO", "President", "Chairman", "Senator",
    "Founder", "founder", "co-founder",
];

const MONTHS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Lowercase connectors allowed inside a capitalized name
const NAME_CONNECTORS: &[&str] = &["of", "and", "&", "de", "van", "von"];

/// Sentence terminators
const TERMINATORS: &[&str] = &[".", "!", "?"];

/// Gazetteer entry
#[derive(Debug, Clone)]
struct DictionaryEntry {
    tokens: Vec<String>,
    label: EntityLabel,
}

/// Rule-based tagger using regex patterns and a dictionary
pub struct RuleBasedTagger {
    /// Token pattern
    token_pattern: Regex,
    /// Four-digit year
    year_pattern: Regex,
    /// Dictionary keyed by lowercased first token
    dictionary: HashMap<String, Vec<DictionaryEntry>>,
}

impl RuleBasedTagger {
    /// Create a tagger with the default gazetteer
    pub fn new() -> Result<Self> {
        let mut tagger = Self::empty()?;
        tagger.init_gazetteer();
        Ok(tagger)
    }

    /// Create a tagger with no dictionary terms
    pub fn empty() -> Result<Self> {
        let token_pattern = Regex::new(
            r"(?:Mr|Mrs|Ms|Dr|Prof|Jr|Sr|St|Inc|Corp|Co|Ltd)\.|[\p{L}\p{N}]+(?:['’&.-][\p{L}\p{N}]+)*|[^\s\p{L}\p{N}]",
        )
        .map_err(|e| SnowballError::TaggerError(format!("invalid token pattern: {e}")))?;
        let year_pattern = Regex::new(r"^(1[5-9]|20)\d{2}$")
            .map_err(|e| SnowballError::TaggerError(format!("invalid year pattern: {e}")))?;

        Ok(Self {
            token_pattern,
            year_pattern,
            dictionary: HashMap::new(),
        })
    }

    /// Initialize well-known places
    fn init_gazetteer(&mut self) {
        for city in [
            "New York City", "Los Angeles", "San Francisco", "Seattle", "Redmond", "Boston",
            "Chicago", "London", "Paris", "Berlin", "Tokyo", "Palo Alto", "Cupertino",
            "Mountain View", "Cambridge",
        ] {
            self.add_term(city, EntityLabel::City);
        }
        for state in [
            "California", "Washington", "Texas", "Massachusetts", "New York", "Florida",
            "Illinois", "Ontario",
        ] {
            self.add_term(state, EntityLabel::StateOrProvince);
        }
        for country in [
            "United States", "USA", "United Kingdom", "Canada", "France", "Germany", "India",
            "China", "Japan",
        ] {
            self.add_term(country, EntityLabel::Country);
        }
    }

    /// Add a dictionary term; multi-word terms are matched token by token
    pub fn add_term(&mut self, term: &str, label: EntityLabel) {
        let tokens: Vec<String> = self
            .token_pattern
            .find_iter(term)
            .map(|m| m.as_str().to_string())
            .collect();
        let Some(first) = tokens.first() else {
            return;
        };

        let entries = self.dictionary.entry(first.to_lowercase()).or_default();
        entries.push(DictionaryEntry { tokens, label });
        // longest terms first so "New York City" wins over "New York"
        entries.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()));
    }

    /// Split text into tokens
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.token_pattern
            .find_iter(text)
            .map(|m| {
                let text = m.as_str();
                if text.chars().any(|c| c.is_alphanumeric()) {
                    Token::word(text)
                } else {
                    Token::punct(text)
                }
            })
            .collect()
    }

    /// Group tokens into sentences at terminal punctuation
    pub fn segment(&self, tokens: Vec<Token>) -> Vec<Vec<Token>> {
        let mut sentences = Vec::new();
        let mut current = Vec::new();

        for token in tokens {
            let terminal = token.is_punct && TERMINATORS.contains(&token.text.as_str());
            current.push(token);
            if terminal {
                sentences.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            sentences.push(current);
        }

        sentences
    }

    /// Recognize entities in one sentence
    pub fn recognize(&self, tokens: &[Token]) -> Vec<EntitySpan> {
        let mut spans: Vec<(usize, usize, EntityLabel)> = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            if let Some((end, label)) = self.match_dictionary(tokens, i) {
                spans.push((i, end, label));
                i = end;
                continue;
            }
            if let Some(end) = self.match_date(tokens, i) {
                spans.push((i, end, EntityLabel::Date));
                i = end;
                continue;
            }
            if let Some(end) = capitalized_run(tokens, i) {
                spans.push((i, end, classify_name(tokens, i, end)));
                i = end;
                continue;
            }
            i += 1;
        }

        spans
            .into_iter()
            .filter(|(start, end, label)| {
                // single capitalized words at sentence start are too noisy
                *label != EntityLabel::Person || *end - *start > 1 || *start > 0
            })
            .map(|(start, end, label)| EntitySpan {
                text: join_tokens(&tokens[start..end]),
                label: label.as_str().to_string(),
                start,
                end,
            })
            .collect()
    }

    fn match_dictionary(&self, tokens: &[Token], start: usize) -> Option<(usize, EntityLabel)> {
        let entries = self.dictionary.get(&tokens[start].text.to_lowercase())?;

        entries.iter().find_map(|entry| {
            let end = start + entry.tokens.len();
            let matches = end <= tokens.len()
                && tokens[start..end]
                    .iter()
                    .zip(&entry.tokens)
                    .all(|(t, term)| t.text.eq_ignore_ascii_case(term));
            matches.then_some((end, entry.label))
        })
    }

    fn match_date(&self, tokens: &[Token], start: usize) -> Option<usize> {
        let text = tokens[start].text.as_str();

        if self.year_pattern.is_match(text) {
            return Some(start + 1);
        }

        if MONTHS.contains(&text) {
            let mut end = start + 1;
            // "March 4 , 1975" / "March 1975"
            if let Some(day) = tokens.get(end) {
                if day.text.len() <= 2 && day.text.chars().all(|c| c.is_ascii_digit()) {
                    end += 1;
                    if tokens.get(end).is_some_and(|t| t.text == ",") {
                        end += 1;
                    }
                }
            }
            if tokens.get(end).is_some_and(|t| self.year_pattern.is_match(&t.text)) {
                end += 1;
            } else if tokens.get(end - 1).is_some_and(|t| t.text == ",") {
                end -= 1;
            }
            return Some(end);
        }

        None
    }
}

#[async_trait::async_trait]
impl Tagger for RuleBasedTagger {
    async fn segment_and_tag(&self, text: &str) -> Result<Vec<TaggedSentence>> {
        let sentences = self
            .segment(self.tokenize(text))
            .into_iter()
            .map(|tokens| {
                let entities = self.recognize(&tokens);
                TaggedSentence { tokens, entities }
            })
            .collect();

        Ok(sentences)
    }
}

fn is_capitalized(token: &Token) -> bool {
    !token.is_punct && token.text.chars().next().is_some_and(|c| c.is_uppercase())
}

/// End of a run of capitalized tokens starting at `start`
fn capitalized_run(tokens: &[Token], start: usize) -> Option<usize> {
    let text = tokens[start].text.as_str();
    if !is_capitalized(&tokens[start]) || MONTHS.contains(&text) || PERSON_TITLES.contains(&text) {
        return None;
    }

    let mut end = start + 1;
    while end < tokens.len() {
        if is_capitalized(&tokens[end]) && !PERSON_TITLES.contains(&tokens[end].text.as_str()) {
            end += 1;
        } else if NAME_CONNECTORS.contains(&tokens[end].text.as_str())
            && tokens.get(end + 1).is_some_and(is_capitalized)
        {
            end += 2;
        } else {
            break;
        }
    }

    Some(end)
}

fn classify_name(tokens: &[Token], start: usize, end: usize) -> EntityLabel {
    let first = tokens[start].text.as_str();
    let last = tokens[end - 1].text.as_str();

    if ORG_SUFFIXES.contains(&last) || ORG_PREFIXES.contains(&first) {
        return EntityLabel::Organization;
    }
    if tokens[start..end]
        .iter()
        .any(|t| t.text.chars().count() > 1 && t.text.chars().all(|c| c.is_uppercase()))
    {
        // acronyms such as IBM or MIT
        return EntityLabel::Organization;
    }
    if start > 0 && PERSON_TITLES.contains(&tokens[start - 1].text.as_str()) {
        return EntityLabel::Person;
    }
    if end - start == 1 {
        let previous = start
            .checked_sub(1)
            .map(|i| tokens[i].text.to_lowercase())
            .unwrap_or_default();
        match previous.as_str() {
            "in" | "to" | "near" => return EntityLabel::Location,
            "at" | "of" | "for" | "joined" | "with" | "from" => return EntityLabel::Organization,
            _ => {}
        }
    }
    EntityLabel::Person
}

fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(text: &str) -> Vec<TaggedSentence> {
        let tagger = RuleBasedTagger::new().unwrap();
        tokio_test::block_on(tagger.segment_and_tag(text)).unwrap()
    }

    fn labeled(sentence: &TaggedSentence) -> Vec<(&str, &str)> {
        sentence
            .entities
            .iter()
            .map(|e| (e.text.as_str(), e.label.as_str()))
            .collect()
    }

    #[test]
    fn test_tokenize_marks_punctuation() {
        let tagger = RuleBasedTagger::new().unwrap();
        let tokens = tagger.tokenize("Gates, who founded Microsoft Corp., retired.");

        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Gates", ",", "who", "founded", "Microsoft", "Corp.", ",", "retired", "."]
        );
        assert!(tokens[1].is_punct);
        assert!(!tokens[5].is_punct);
        assert!(tokens[8].is_punct);
    }

    #[test]
    fn test_segment_at_terminators() {
        let sentences = tag("Bill Gates founded Microsoft. He lives in Seattle! Really?");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].tokens.last().unwrap().text, ".");
        assert_eq!(sentences[2].text(), "Really ?");
    }

    #[test]
    fn test_trailing_text_without_terminator_is_kept() {
        let sentences = tag("Satya Nadella leads Microsoft");
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].tokens.len(), 4);
    }

    #[test]
    fn test_recognizes_person_and_organization() {
        let sentences = tag("Bill Gates attended Harvard University in 1973.");
        let entities = labeled(&sentences[0]);

        assert!(entities.contains(&("Bill Gates", "PERSON")));
        assert!(entities.contains(&("Harvard University", "ORGANIZATION")));
        assert!(entities.contains(&("1973", "DATE")));
    }

    #[test]
    fn test_dictionary_prefers_longest_term() {
        let sentences = tag("She moved to New York City last year.");
        let entities = labeled(&sentences[0]);
        assert!(entities.contains(&("New York City", "CITY")));
        assert!(!entities.iter().any(|(t, _)| *t == "New York"));
    }

    #[test]
    fn test_custom_terms() {
        let mut tagger = RuleBasedTagger::new().unwrap();
        tagger.add_term("Microsoft", EntityLabel::Organization);

        let sentences =
            tokio_test::block_on(tagger.segment_and_tag("Satya Nadella runs Microsoft.")).unwrap();
        let entities = labeled(&sentences[0]);
        assert!(entities.contains(&("Microsoft", "ORGANIZATION")));
        assert!(entities.contains(&("Satya Nadella", "PERSON")));
    }

    #[test]
    fn test_month_dates() {
        let sentences = tag("He joined on March 4, 1975 as an engineer.");
        let entities = labeled(&sentences[0]);
        assert!(entities.contains(&("March 4 , 1975", "DATE")));
    }

    #[test]
    fn test_spans_line_up_with_tokens() {
        for sentence in tag("Dr. Lisa Su became CEO of AMD in 2014, moving to Austin.") {
            for entity in &sentence.entities {
                assert_eq!(join_tokens(&sentence.tokens[entity.start..entity.end]), entity.text);
            }
        }
    }

    #[test]
    fn test_single_name_after_of_is_an_organization() {
        let sentences = tag("Sundar Pichai is the CEO of Google.");
        let entities = labeled(&sentences[0]);
        assert!(entities.contains(&("Google", "ORGANIZATION")));
        assert!(entities.contains(&("Sundar Pichai", "PERSON")));
    }

    #[test]
    fn test_acronyms_are_organizations() {
        let sentences = tag("Later she taught at MIT for years.");
        let entities = labeled(&sentences[0]);
        assert!(entities.contains(&("MIT", "ORGANIZATION")));
    }
}
