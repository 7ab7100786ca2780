/// Turns a question into search keywords. Non-empty input yields a non-empty set.
pub trait KeywordExtractor: Send + Sync {
    fn extract(&self, question: &str) -> Vec<String>;
}

const STOPWORDS: &[&str] = &[
    // pt
    "qual", "quais", "quem", "onde", "quando", "a", "o", "os", "as", "de", "do", "da", "dos",
    "das", "em", "um", "uma", "para", "é", "foi", "que", "com", "como", "e", "por", "na", "no",
    "nas", "nos", "se", "ao", "sobre",
    // en
    "what", "which", "who", "whom", "where", "when", "why", "how", "is", "are", "was", "were",
    "the", "an", "of", "in", "on", "for", "to", "and", "or", "does", "do", "did", "about",
];

fn is_stopword(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOPWORDS.contains(&lower.as_str())
}

fn tokens(question: &str) -> Vec<String> {
    question
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '\'')
                .to_string()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn is_entity_word(word: &str) -> bool {
    is_capitalized(word) && !is_stopword(word)
}

/// Proper-noun heuristic: runs of capitalized, non-stopword tokens form one entity.
///
/// The sentence-initial token only starts an entity when the next token is
/// capitalized too, so a leading imperative ("Explain", "List") is not mistaken
/// for a name. When the only entity sits at the start of the question, the
/// remaining content words are kept alongside it. Without entities the result
/// is the lowercase tokens minus stopwords, then all tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicKeywords;

impl HeuristicKeywords {
    /// Entities with the index of the token each one starts at.
    fn entities(words: &[String]) -> Vec<(usize, String)> {
        let mut entities = Vec::new();
        let mut run: Vec<&str> = Vec::new();
        let mut run_start = 0;
        for (i, w) in words.iter().enumerate() {
            let leading_alone = i == 0 && !words.get(1).is_some_and(|next| is_entity_word(next));
            if is_entity_word(w) && !leading_alone {
                if run.is_empty() {
                    run_start = i;
                }
                run.push(w);
                continue;
            }
            if !run.is_empty() {
                entities.push((run_start, run.join(" ")));
                run.clear();
            }
        }
        if !run.is_empty() {
            entities.push((run_start, run.join(" ")));
        }
        entities
    }
}

impl KeywordExtractor for HeuristicKeywords {
    fn extract(&self, question: &str) -> Vec<String> {
        let words = tokens(question);
        let entities = Self::entities(&words);
        if entities.iter().any(|(start, _)| *start > 0) {
            return entities.into_iter().map(|(_, e)| e).collect();
        }

        let in_entity: Vec<String> = entities
            .iter()
            .flat_map(|(_, e)| e.split(' ').map(str::to_lowercase))
            .collect();
        let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let mut content: Vec<(usize, String)> = lowered
            .iter()
            .enumerate()
            .filter(|(_, w)| !is_stopword(w) && !in_entity.contains(*w))
            .map(|(i, w)| (i, w.clone()))
            .collect();
        // A capitalized opener is usually a verb; drop it when other words remain.
        let opener_is_verb = entities.is_empty() && words.first().is_some_and(|w| is_capitalized(w));
        if opener_is_verb && content.len() > 1 && content[0].0 == 0 {
            content.remove(0);
        }

        let mut out: Vec<String> = entities.into_iter().map(|(_, e)| e).collect();
        out.extend(content.into_iter().map(|(_, w)| w));
        if !out.is_empty() {
            return out;
        }
        if !lowered.is_empty() {
            return lowered;
        }
        let trimmed = question.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    }
}
