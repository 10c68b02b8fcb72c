//! Dialogue lookup across speaker files.

use std::collections::{BTreeMap, HashSet};

use city_model::{DialogueContext, DialogueFragment, DialogueLibraryFile, Speaker};
use rand::seq::SliceRandom;
use rand::Rng;

/// Merged dialogue for every speaker.
#[derive(Debug, Clone, Default)]
pub struct DialogueLibrary {
    fragments: Vec<DialogueFragment>,
    ids: HashSet<String>,
    terminology: BTreeMap<Speaker, Vec<String>>,
}

impl DialogueLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a speaker file. Fragment ids already present are skipped.
    pub fn merge(&mut self, file: DialogueLibraryFile) {
        if let Some(terms) = file.alternate_terminology {
            let known = self.terminology.entry(file.speaker).or_default();
            for term in terms {
                if !known.contains(&term) {
                    known.push(term);
                }
            }
        }

        for fragment in file.dialogue_fragments {
            if !self.ids.insert(fragment.id.clone()) {
                tracing::warn!("Skipping duplicate dialogue fragment {}", fragment.id);
                continue;
            }
            self.fragments.push(fragment);
        }
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments_for(
        &self,
        speaker: Speaker,
        context: DialogueContext,
    ) -> impl Iterator<Item = &DialogueFragment> {
        self.fragments
            .iter()
            .filter(move |f| f.speaker == speaker && f.context == context)
    }

    /// A random line for the speaker in this context.
    pub fn line(
        &self,
        speaker: Speaker,
        context: DialogueContext,
        rng: &mut impl Rng,
    ) -> Option<String> {
        let groups: Vec<&DialogueFragment> = self.fragments_for(speaker, context).collect();
        let group = groups.choose(rng)?;
        group.fragments.choose(rng).cloned()
    }

    /// Another name the speaker goes by, if any were authored.
    pub fn alternate_name(&self, speaker: Speaker, rng: &mut impl Rng) -> Option<&str> {
        self.terminology
            .get(&speaker)
            .and_then(|terms| terms.choose(rng))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn water_file(ids: &[&str]) -> DialogueLibraryFile {
        DialogueLibraryFile {
            speaker: Speaker::Water,
            alternate_terminology: Some(vec!["the mains".to_string()]),
            dialogue_fragments: ids
                .iter()
                .map(|id| DialogueFragment {
                    id: id.to_string(),
                    speaker: Speaker::Water,
                    fragments: vec![format!("{id} line")],
                    context: DialogueContext::ThreadWoven,
                    tags: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_appends_and_skips_duplicates() {
        let mut library = DialogueLibrary::new();
        library.merge(water_file(&["w1", "w2"]));
        library.merge(water_file(&["w2", "w3"]));

        assert_eq!(library.len(), 3);
        assert_eq!(
            library
                .fragments_for(Speaker::Water, DialogueContext::ThreadWoven)
                .count(),
            3
        );
    }

    #[test]
    fn test_line_by_speaker_and_context() {
        let mut library = DialogueLibrary::new();
        library.merge(water_file(&["w1"]));
        let mut rng = SmallRng::seed_from_u64(1);

        assert_eq!(
            library.line(Speaker::Water, DialogueContext::ThreadWoven, &mut rng),
            Some("w1 line".to_string())
        );
        assert_eq!(library.line(Speaker::Water, DialogueContext::Farewell, &mut rng), None);
        assert_eq!(library.line(Speaker::Power, DialogueContext::ThreadWoven, &mut rng), None);
    }

    #[test]
    fn test_alternate_terminology_deduplicated() {
        let mut library = DialogueLibrary::new();
        library.merge(water_file(&[]));
        library.merge(water_file(&[]));
        let mut rng = SmallRng::seed_from_u64(1);

        assert_eq!(library.alternate_name(Speaker::Water, &mut rng), Some("the mains"));
        assert_eq!(library.terminology.get(&Speaker::Water).map(Vec::len), Some(1));
        assert_eq!(library.alternate_name(Speaker::City, &mut rng), None);
    }
}
